use std::path::PathBuf;
use thiserror::Error;

/// Failures of the record store behind the hub.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Record store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The directory that should hold the database file could not be made.
    #[error("Failed to create database directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A thread panicked while holding the connection.
    #[error("Record store connection lock poisoned")]
    LockPoisoned,
}
