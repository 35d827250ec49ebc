#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary database and remote folder
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
    remote_dir: PathBuf,
    user_id: Option<String>,
}

impl CliTestHarness {
    /// Signed-out harness with its own database and remote folder
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let remote_dir = temp_dir.path().join("cloud");

        Self {
            temp_dir,
            db_path,
            remote_dir,
            user_id: None,
        }
    }

    pub fn signed_in(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Self::new()
        }
    }

    /// A second device: its own database, sharing this harness's remote folder
    pub fn second_device(&self) -> Self {
        let mut other = Self::new();
        other.remote_dir = self.remote_dir.clone();
        other.user_id = self.user_id.clone();
        other
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("daysync").expect("Failed to find daysync binary");

        cmd.env("DAYSYNC_CONFIG", self.temp_dir.path().join("absent.toml"));
        cmd.env("DAYSYNC_DATABASE_PATH", &self.db_path);
        cmd.env("DAYSYNC_REMOTE_DIR", &self.remote_dir);
        cmd.env("DAYSYNC_TIMEZONE", "UTC");
        cmd.env_remove("DAYSYNC_USER_ID");
        cmd.env_remove("RUST_LOG");
        if let Some(user) = &self.user_id {
            cmd.env("DAYSYNC_USER_ID", user);
        }

        cmd
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Folder holding this user's uploaded documents
    pub fn remote_collection(&self) -> PathBuf {
        let user = self.user_id.as_deref().unwrap_or("nobody");
        self.remote_dir.join("users").join(user).join("daily_tasks")
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check if output contains task table headers
    pub fn has_task_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Title"))
            .and(predicate::str::contains("Date"))
    }

    /// Predicate to check if output indicates successful task creation
    pub fn task_created_successfully() -> impl Predicate<str> {
        predicate::str::contains("Created task").or(predicate::str::contains("Created recurring task"))
    }

    /// Predicate to check for empty result set
    pub fn empty_result() -> impl Predicate<str> {
        predicate::str::contains("No tasks found")
    }
}
