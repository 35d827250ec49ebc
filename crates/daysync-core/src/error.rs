use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),
}

/// Failures raised by a remote document store adapter.
///
/// These never reach the caller of a task mutation; the sync engine records
/// them in the sync state and retries the operation on a later drain.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("no authenticated user")]
    Unauthenticated,

    #[error("document conflict: {0}")]
    Conflict(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("remote IO error")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}
