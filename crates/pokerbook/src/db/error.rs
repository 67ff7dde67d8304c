use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// An update addressed a row that does not exist.
    #[error("No {table} row with id {id}")]
    MissingRow { table: &'static str, id: i64 },

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}
