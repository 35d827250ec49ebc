//! # Daysync Core Library
//!
//! An offline-first engine for day-scheduled tasks: a local SQLite store that
//! is always readable, a remote document collection it is reconciled with in
//! the background, and a materializer that turns recurring templates into
//! concrete daily instances.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Tasks, recurrence patterns, sync operations and state
//! - [`store`]: Local store traits, the SQLite adapter and live queries
//! - [`remote`]: Remote store trait, document format and adapters
//! - [`sync`]: Pending-operation queue, sync engine, merge and background worker
//! - [`recurrence`]: Recurring-task materialization
//! - [`service`]: The task service facade consumed by UIs
//! - [`timezone`]: Timezone helpers for computing "today"
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use daysync_core::{
//!     db, models::{NewTask, Recurrence, SyncConfig}, remote::FileRemoteStore,
//!     service::TaskService, store::SqliteLocalStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("tasks.db").await?;
//!     let local = Arc::new(SqliteLocalStore::new(pool));
//!     let remote = Arc::new(FileRemoteStore::new("cloud", Some("alice".to_string())));
//!
//!     let service = TaskService::new(local, remote, SyncConfig::default(), chrono_tz::UTC);
//!     service.start().await?;
//!
//!     let task = service
//!         .add_task(NewTask {
//!             title: "Stretch".to_string(),
//!             recurrence: Some(Recurrence::daily()),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("Created task: {}", task.title);
//!
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod remote;
pub mod service;
pub mod store;
pub mod sync;
pub mod timezone;
