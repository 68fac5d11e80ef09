/// pgsh Error Module
///
/// This module defines the error types for the pgsh session engine.
/// Every failure that can happen while a statement or meta-command is
/// processed is represented here, so the session loop can report it
/// inline as `ERROR: <message>` and carry on.
use std::time::Duration;
use thiserror::Error;

/// Error type for the pgsh application.
///
/// The variants follow the failure taxonomy of an interactive session:
/// - Connection establishment (initial connect and `\c` switches)
/// - Per-statement backend failures and timeouts
/// - Malformed meta-command invocations
/// - Configuration loading and validation
/// - Terminal I/O
#[derive(Error, Debug)]
pub enum PgshError {
    /// Establishing or re-establishing a backend connection failed
    #[error("{0}")]
    Connection(String),

    /// The backend rejected a statement; holds the server message only
    #[error("{0}")]
    Backend(String),

    /// The statement was cancelled because it ran past its time bound
    #[error("canceling statement due to timeout after {}", format_duration(.0))]
    Timeout(Duration),

    /// A meta-command was recognised but invoked incorrectly
    #[error("{0}")]
    Command(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal and file I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result to use PgshError as the error type.
pub type Result<T> = std::result::Result<T, PgshError>;

impl From<postgres::Error> for PgshError {
    fn from(e: postgres::Error) -> Self {
        // Server-side errors carry a clean message; everything else (closed
        // connection, protocol trouble) is described by the driver itself.
        match e.as_db_error() {
            Some(db) => PgshError::Backend(db.message().to_string()),
            None => PgshError::Backend(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for PgshError {
    fn from(e: r2d2::Error) -> Self {
        PgshError::Connection(e.to_string())
    }
}

fn format_duration(d: &Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let backend_err = PgshError::Backend("relation \"t\" does not exist".to_string());
        assert_eq!(backend_err.to_string(), "relation \"t\" does not exist");

        let config_err = PgshError::Config("max_rows must be at least 1".to_string());
        assert!(config_err.to_string().contains("Configuration error"));

        let timeout = PgshError::Timeout(Duration::from_secs(30));
        assert_eq!(timeout.to_string(), "canceling statement due to timeout after 30s");

        let timeout = PgshError::Timeout(Duration::from_millis(250));
        assert!(timeout.to_string().ends_with("250ms"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let pgsh_err: PgshError = io_err.into();
        match pgsh_err {
            PgshError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }
    }
}
