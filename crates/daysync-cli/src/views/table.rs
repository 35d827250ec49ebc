use chrono::{NaiveDate, TimeZone, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use daysync_core::models::Task;
use daysync_core::sync::PendingOperation;

pub fn display_tasks(tasks: &[Task], today: NaiveDate) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Date", "Hours", "Repeats", "Synced"]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(task.local_id));

        let mut display_title = String::new();
        if task.is_done {
            display_title.push_str("✓ ");
        } else if task.is_recurring() {
            display_title.push_str("↻ ");
        }
        display_title.push_str(&task.title);
        if let Some(description) = &task.description {
            display_title.push_str("\n  ");
            display_title.push_str(description);
        }

        let title_cell = if task.is_done {
            Cell::new(display_title)
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey)
        } else if task.date < today {
            Cell::new(display_title).fg(Color::Red) // Overdue
        } else {
            Cell::new(display_title)
        };
        row.add_cell(title_cell);

        let date_cell = Cell::new(task.date.format("%a %Y-%m-%d"));
        row.add_cell(if task.date == today && !task.is_done {
            date_cell.fg(Color::Yellow)
        } else {
            date_cell
        });

        row.add_cell(Cell::new(format!("{:.1}", task.expected_hours)));
        row.add_cell(Cell::new(
            task.recurrence
                .as_ref()
                .map_or_else(|| "-".to_string(), |r| r.to_string()),
        ));
        row.add_cell(if task.remote_id.is_some() {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        });
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_operations(operations: &[PendingOperation]) {
    if operations.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Operation", "Task", "Attempts", "Last error"]);

    for entry in operations {
        let task = entry.operation.task();
        let queued_at = Utc
            .timestamp_millis_opt(task.updated_at)
            .single()
            .map(|at| at.humanize())
            .unwrap_or_default();
        let mut row = Row::new();
        row.add_cell(Cell::new(entry.operation.kind()));
        row.add_cell(Cell::new(format!("{} ({})", task.title, queued_at)));
        row.add_cell(Cell::new(entry.attempts));
        row.add_cell(
            Cell::new(entry.last_error.as_deref().unwrap_or("-")).fg(if entry.last_error.is_some() {
                Color::Red
            } else {
                Color::Reset
            }),
        );
        table.add_row(row);
    }

    println!("{table}");
}
