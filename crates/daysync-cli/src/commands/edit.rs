use anyhow::Result;
use daysync_core::error::CoreError;
use owo_colors::OwoColorize;

use crate::cli::EditCommand;
use crate::commands::Service;
use crate::parser::{build_recurrence, parse_day};

pub async fn edit_task(service: &Service, command: EditCommand) -> Result<()> {
    let mut task = service
        .task(command.id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("local task {}", command.id)))?;

    if let Some(title) = command.title {
        task.title = title;
    }
    if command.description_clear {
        task.description = None;
    } else if let Some(description) = command.description {
        task.description = Some(description);
    }
    if let Some(date) = command.date.as_deref() {
        task.date = parse_day(date, service.timezone())?;
    }
    if let Some(hours) = command.hours {
        task.expected_hours = hours;
    }
    if command.recurrence_clear {
        task.recurrence = None;
    } else if let Some(recurrence) = build_recurrence(&command.recurrence, task.date)? {
        task.recurrence = Some(recurrence);
    }

    let updated = service.update_task(task).await?;
    println!("{} Updated task: '{}'", "✓".green().bold(), updated.title);
    Ok(())
}
