use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use daysync_core::db;
use daysync_core::error::{CoreError, RemoteError};
use daysync_core::remote::FileRemoteStore;
use daysync_core::service::TaskService;
use daysync_core::store::SqliteLocalStore;
use owo_colors::{OwoColorize, Style};

mod cli;
mod commands;
mod config;
mod parser;
mod timezone;
mod views;

use cli::Commands;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log_level);

    if let Err(e) = run(cli.command, config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Commands, config: config::Config) -> Result<()> {
    let tz = timezone::normalize_timezone_input(&config.timezone)?;
    let pool = db::establish_connection(&config.database_path).await?;
    let local = Arc::new(SqliteLocalStore::new(pool));
    let remote = Arc::new(FileRemoteStore::new(&config.remote_dir, config.user_id.clone()));
    let service = TaskService::new(local.clone(), remote.clone(), config.sync.to_sync_config(), tz);
    tracing::debug!(database = %config.database_path.display(), timezone = %tz, "daysync ready");

    // `recur` and `watch` run the check themselves; `clear` must not repopulate.
    if !matches!(command, Commands::Recur(_) | Commands::Watch | Commands::Clear(_)) {
        service.trigger_recurrence_check().await?;
    }

    // Startup materialization may have queued uploads as well.
    let flush_queue = !matches!(command, Commands::Clear(_) | Commands::Watch);

    match command {
        Commands::Add(command) => commands::add::add_task(&service, command).await?,
        Commands::List(command) => commands::list::list_tasks(&service, command).await?,
        Commands::Done(command) => commands::done::set_done(&service, command, true).await?,
        Commands::Undo(command) => commands::done::set_done(&service, command, false).await?,
        Commands::Edit(command) => commands::edit::edit_task(&service, command).await?,
        Commands::Delete(command) => commands::delete::delete_task(&service, command).await?,
        Commands::Push => commands::sync::push(&service).await?,
        Commands::Pull => commands::sync::pull(&service).await?,
        Commands::Recur(command) => commands::recur::materialize(&service, command).await?,
        Commands::Status => commands::sync::status(&service, local.as_ref(), remote.as_ref()).await?,
        Commands::Clear(command) => commands::clear::clear_data(&service, command).await?,
        Commands::Watch => commands::watch::watch(&service).await?,
    }

    if flush_queue {
        commands::sync::flush(&service).await;
    }
    Ok(())
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} Not found: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidTimezone(tz) => {
                eprintln!("{} Unknown timezone '{}'", "Error:".style(error_style), tz.yellow());
                let suggestions = timezone::suggest_timezone(tz);
                if !suggestions.is_empty() {
                    eprintln!("Did you mean one of these?");
                    for suggestion in suggestions {
                        eprintln!("  {}", suggestion.yellow());
                    }
                }
            }
            CoreError::Remote(RemoteError::Unauthenticated) => {
                eprintln!(
                    "{} Not signed in. Set `user_id` in daysync.toml or DAYSYNC_USER_ID.",
                    "Error:".style(error_style)
                );
            }
            CoreError::Remote(e) => {
                eprintln!("{} Remote store: {}", "Error:".style(error_style), e);
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
