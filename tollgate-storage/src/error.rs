//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No record with the given id.
    #[error("there is no {kind} with ID: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A record with the same id already exists.
    #[error("there is already such {kind} with ID: {id}")]
    Conflict { kind: &'static str, id: String },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The backend itself failed (poisoned lock, aborted task).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub(crate) fn license_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "license",
            id: id.to_string(),
        }
    }

    pub(crate) fn key_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "key",
            id: id.to_string(),
        }
    }

    pub(crate) fn license_conflict(id: &str) -> Self {
        Self::Conflict {
            kind: "license",
            id: id.to_string(),
        }
    }

    pub(crate) fn key_conflict(id: &str) -> Self {
        Self::Conflict {
            kind: "key",
            id: id.to_string(),
        }
    }
}
