use anyhow::Result;
use daysync_core::models::NewTask;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::commands::Service;
use crate::parser::{build_recurrence, parse_day};

pub async fn add_task(service: &Service, command: AddCommand) -> Result<()> {
    let date = command
        .date
        .as_deref()
        .map(|d| parse_day(d, service.timezone()))
        .transpose()?;
    let recurrence = build_recurrence(&command.recurrence, date.unwrap_or_else(|| service.today()))?;

    let task = service
        .add_task(NewTask {
            title: command.title,
            description: command.description,
            date,
            recurrence,
            expected_hours: command.hours,
        })
        .await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    match &task.recurrence {
        Some(recurrence) => {
            println!(
                "{} Created recurring task: {}",
                "✓".style(success_style),
                task.title.bright_white().bold()
            );
            println!("  {} Repeats {}", "→".style(info_style), recurrence);
        }
        None => {
            println!("{} Created task: {}", "✓".style(success_style), task.title.bright_white().bold());
        }
    }
    println!("  {} Task ID: {}", "→".style(info_style), task.local_id.yellow());
    println!("  {} Date: {}", "→".style(info_style), task.date.format("%a %Y-%m-%d"));
    Ok(())
}
