use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::cli::ClearCommand;
use crate::commands::Service;

pub async fn clear_data(service: &Service, command: ClearCommand) -> Result<()> {
    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt("Delete every local task and forget pending sync operations?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Clear cancelled.");
            return Ok(());
        }
    }

    service.clear_all_data().await?;
    println!("{} Local data cleared.", "✓".green().bold());
    Ok(())
}
