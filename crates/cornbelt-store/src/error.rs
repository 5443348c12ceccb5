//! Error types for cornbelt-store.

use std::path::PathBuf;

/// Result type for cornbelt-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cornbelt-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The data directory to load from could not be read.
    #[error("Cannot read data directory {path}: {source}")]
    DataDirectory {
        path: PathBuf,
        #[source]
        source: cornbelt_core::Error,
    },

    /// Location not present in the locations table.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Foreign-key enforcement could not be switched back on.
    #[error("Failed to restore foreign key enforcement: {0}")]
    IntegrityRestore(#[source] rusqlite::Error),

    /// Rows reference locations that do not exist.
    #[error("Foreign key check failed: {count} violation(s), first in table '{table}'")]
    ForeignKeyViolations { count: usize, table: String },

    /// A stored value could not be decoded.
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}
