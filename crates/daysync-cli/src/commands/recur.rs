use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::RecurCommand;
use crate::commands::Service;
use crate::parser::parse_day;

pub async fn materialize(service: &Service, command: RecurCommand) -> Result<()> {
    let report = match command.through.as_deref() {
        Some(input) => {
            let through = parse_day(input, service.timezone())?;
            service.trigger_recurrence_check_for(through).await?
        }
        None => service.trigger_recurrence_check().await?,
    };

    if report.created.is_empty() {
        println!("Recurring tasks are up to date through {}.", report.watermark);
    } else {
        println!(
            "{} Created {} recurring task instance(s) through {}:",
            "✓".green().bold(),
            report.created.len(),
            report.watermark
        );
        for task in &report.created {
            println!("  {} {} {}", task.local_id.yellow(), task.date.format("%a %Y-%m-%d"), task.title);
        }
    }
    Ok(())
}
