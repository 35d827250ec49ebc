use serde::Deserialize;
use figment::{Figment, providers::{Format, Toml, Env}};
use daysync_core::models::SyncConfig;
use std::path::PathBuf;
use std::time::Duration;

use crate::timezone::detect_system_timezone;

const CONFIG_FILE: &str = "daysync.toml";
const CONFIG_FILE_ENV: &str = "DAYSYNC_CONFIG";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// SQLite file holding the local task table
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Root of the shared directory acting as the remote store
    #[serde(default = "default_remote_dir")]
    pub remote_dir: PathBuf,
    /// Signed-in user; without one every remote operation is skipped
    #[serde(default)]
    pub user_id: Option<String>,
    /// IANA timezone used to decide what "today" is
    #[serde(default = "detect_system_timezone")]
    pub timezone: String,
    /// Fallback tracing filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Retry and polling knobs for the sync engine
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SyncSettings {
    /// Failed attempts before an operation is dead-lettered; `0` retries forever
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Remote poll period for `watch`; `0` disables polling
    pub pull_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_backoff_ms: defaults.base_backoff.as_millis() as u64,
            max_backoff_ms: defaults.max_backoff.as_millis() as u64,
            pull_interval_secs: defaults.pull_interval.map_or(0, |d| d.as_secs()),
        }
    }
}

impl SyncSettings {
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_attempts: self.max_attempts,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            pull_interval: (self.pull_interval_secs > 0).then(|| Duration::from_secs(self.pull_interval_secs)),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("daysync.db")
}

fn default_remote_dir() -> PathBuf {
    PathBuf::from("daysync-cloud")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Loads `daysync.toml` (or the file named by `DAYSYNC_CONFIG`) overlaid
    /// with `DAYSYNC_*` environment variables; nested keys use `__`.
    pub fn new() -> Result<Self, figment::Error> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(file))
                .merge(Env::prefixed("DAYSYNC_").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        let mut config: Config = figment.extract()?;
        config.user_id = config.user_id.filter(|user| !user.trim().is_empty());
        Ok(config)
    }
}
