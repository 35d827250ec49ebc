use anyhow::Result;
use daysync_core::models::SyncState;
use daysync_core::remote::RemoteStore;
use daysync_core::store::LocalStore;
use owo_colors::{OwoColorize, Style};

use crate::commands::Service;
use crate::views::table::display_operations;

/// Applies whatever this invocation queued before the process exits.
///
/// Operations that still fail are reported and dropped with the process;
/// the affected rows are picked up again by the next `push`.
pub async fn flush(service: &Service) {
    let report = service.sync_now().await;
    let warn_style = Style::new().yellow().bold();

    if report.skipped_unauthenticated > 0 {
        eprintln!(
            "{} Not signed in; {} change(s) kept locally only.",
            "note:".style(warn_style),
            report.skipped_unauthenticated
        );
        return;
    }

    let engine = service.engine();
    let mut failed = engine.pending();
    failed.extend(engine.dead_letters());
    if !failed.is_empty() {
        eprintln!(
            "{} {} change(s) could not be synced; run `daysync push` later.",
            "warning:".style(warn_style),
            failed.len()
        );
        display_operations(&failed);
    }
}

pub async fn push(service: &Service) -> Result<()> {
    let report = service.push_all().await?;
    if report.failed > 0 {
        eprintln!(
            "{} {} task(s) failed to upload.",
            "warning:".yellow().bold(),
            report.failed
        );
    }
    println!("{} Uploaded {} task(s).", "✓".green().bold(), report.uploaded);
    Ok(())
}

pub async fn pull(service: &Service) -> Result<()> {
    let report = service.pull_and_merge().await?;
    println!(
        "{} Merged remote tasks: {} new, {} updated.",
        "✓".green().bold(),
        report.inserted,
        report.updated
    );
    if report.skipped > 0 {
        eprintln!(
            "{} Skipped {} unreadable remote document(s).",
            "warning:".yellow().bold(),
            report.skipped
        );
    }
    Ok(())
}

pub fn describe_state(state: &SyncState) -> String {
    match state {
        SyncState::Error(message) => message.red().to_string(),
        SyncState::Synced => state.green().to_string(),
        other => other.to_string(),
    }
}

pub async fn status(service: &Service, local: &impl LocalStore, remote: &impl RemoteStore) -> Result<()> {
    let tasks = local.query_all().await?;
    let unsynced = tasks.iter().filter(|t| t.remote_id.is_none()).count();
    let label = Style::new().bold();

    println!(
        "{} {}",
        "User:".style(label),
        remote.user_id().unwrap_or_else(|| "not signed in".to_string())
    );
    println!("{} {}", "Timezone:".style(label), service.timezone());
    println!("{} {}", "Today:".style(label), service.today());
    println!(
        "{} {} total, {} not yet uploaded",
        "Tasks:".style(label),
        tasks.len(),
        unsynced
    );
    match service.recurrence_watermark().await? {
        Some(watermark) => println!("{} {}", "Recurring through:".style(label), watermark),
        None => println!("{} never", "Recurring through:".style(label)),
    }
    println!("{} {}", "Sync:".style(label), describe_state(&service.engine().state()));
    Ok(())
}
