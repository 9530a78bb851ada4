//! Error types for the music library.

use std::path::PathBuf;
use thiserror::Error;

use crate::db::connection::StorageFailure;

/// Main error type for library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// A statement failed inside the storage gateway and was rolled back.
    #[error("Storage error: {0}")]
    Storage(StorageFailure),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed, database restored from {backup_path:?}: {message}")]
    Migration {
        message: String,
        backup_path: PathBuf,
        #[source]
        source: Option<Box<LibraryError>>,
    },

    #[error("Table {table} has {actual} rows after migration, expected {expected}")]
    RowCountMismatch {
        table: String,
        expected: i64,
        actual: i64,
    },

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Metadata error for {path:?}: {message}")]
    Metadata { path: PathBuf, message: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A statement returned a shape the caller did not expect (rows from a write, etc.)
    #[error("Unexpected statement result: {0}")]
    UnexpectedOutcome(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

impl LibraryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LibraryError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StorageFailure> for LibraryError {
    fn from(failure: StorageFailure) -> Self {
        LibraryError::Storage(failure)
    }
}

impl From<rusqlite::Error> for LibraryError {
    fn from(err: rusqlite::Error) -> Self {
        LibraryError::Storage(StorageFailure::from(&err))
    }
}
