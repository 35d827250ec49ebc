use anyhow::Result;

use crate::cli::ListCommand;
use crate::commands::Service;
use crate::parser::parse_day;
use crate::views::table::display_tasks;

pub async fn list_tasks(service: &Service, command: ListCommand) -> Result<()> {
    let today = service.today();

    let tasks = if command.all {
        let mut tasks = service.all_tasks().current().await?;
        if command.done || command.pending {
            tasks.retain(|t| t.is_done == command.done);
        }
        tasks
    } else {
        let date = match command.date.as_deref() {
            Some(input) => parse_day(input, service.timezone())?,
            None => today,
        };
        let query = if command.done {
            service.completed_for(date)
        } else if command.pending {
            service.pending_for(date)
        } else {
            service.tasks_for_day(date)
        };
        query.current().await?
    };

    display_tasks(&tasks, today);
    Ok(())
}
