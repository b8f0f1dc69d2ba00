//! Error type for database operations.

/// Error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] oracle::Error),
    #[error("Invalid database settings: {0}")]
    Settings(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Procedure {0} did not return the expected output")]
    MissingOutput(String),
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
