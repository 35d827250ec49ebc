use anyhow::Result;
use daysync_core::error::CoreError;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::cli::DeleteCommand;
use crate::commands::Service;

pub async fn delete_task(service: &Service, command: DeleteCommand) -> Result<()> {
    let task = service
        .task(command.id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("local task {}", command.id)))?;

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!("Are you sure you want to delete task '{}'?", task.title))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let removed = service.delete_task(task.local_id).await?;
    println!("{} Deleted task: '{}'", "✓".green().bold(), removed.title);
    Ok(())
}
