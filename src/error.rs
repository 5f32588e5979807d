//! Error types for testermatching

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Query or transaction failure
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Could not check a connection out of the pool
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking database task panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(#[from] rocket::tokio::task::JoinError),

    /// Lookup by id found nothing. The message is shown to the user as is.
    #[error("{0}")]
    NotFound(String),

    /// Request was well-formed but breaks a rule (no-op edit, duplicate name).
    #[error("{0}")]
    Invalid(String),

    /// Row is still referenced by bugs or experience and cannot be deleted.
    #[error("{0}")]
    InUse(String),
}

impl Error {
    pub fn not_found(kind: &str, id: i32) -> Self {
        Error::NotFound(format!("No {} with ID {}", kind, id))
    }

    /// Whether the message is meant for the user rather than the log.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Invalid(_) | Error::InUse(_))
    }
}
