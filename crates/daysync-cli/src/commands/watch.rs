use anyhow::Result;
use owo_colors::OwoColorize;

use crate::commands::sync::describe_state;
use crate::commands::Service;
use crate::views::table::display_tasks;

/// Runs the background worker and reprints today's list on every change until Ctrl-C.
pub async fn watch(service: &Service) -> Result<()> {
    let report = service.start().await?;
    if !report.created.is_empty() {
        println!("Created {} recurring task instance(s).", report.created.len());
    }

    let mut today = service.tasks_for_today();
    let mut state = service.sync_state();
    let mut errors = service.errors();
    println!("{}", "Watching today's tasks, press Ctrl-C to stop.".bright_black());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            emission = today.next() => match emission {
                Some(Ok(tasks)) => display_tasks(&tasks, service.today()),
                Some(Err(e)) => eprintln!("{} {}", "Error:".red().bold(), e),
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                println!("{} {}", "sync:".bright_black(), describe_state(&current));
            }
            changed = errors.changed() => {
                if changed.is_err() {
                    break;
                }
                let message = errors.borrow_and_update().clone();
                if let Some(message) = message {
                    eprintln!("{} {}", "Error:".red().bold(), message);
                    service.clear_error();
                }
            }
        }
    }

    service.shutdown().await;
    Ok(())
}
