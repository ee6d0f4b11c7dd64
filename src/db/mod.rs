pub mod repository;
pub mod seed;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Seed fixture {fixture} is invalid: {reason}")]
    Seed { fixture: &'static str, reason: String },
}

#[cfg(test)]
pub(crate) mod test_support;
