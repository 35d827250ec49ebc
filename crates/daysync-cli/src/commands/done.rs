use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::IdCommand;
use crate::commands::Service;

pub async fn set_done(service: &Service, command: IdCommand, done: bool) -> Result<()> {
    let task = service.set_done(command.id, done).await?;
    if done {
        println!("{} Completed task: '{}'", "✓".green().bold(), task.title);
    } else {
        println!("{} Reopened task: '{}'", "↺".blue().bold(), task.title);
    }
    Ok(())
}
