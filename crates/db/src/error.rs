use std::time::Duration;

use thiserror::Error;

/// Failures of the storage engine itself, independent of what is stored.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database operation '{operation}' timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("database task failed: {0}")]
    Join(String),

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("database connection is closed")]
    Closed,

    #[error("database io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("migration '{module}/{id}' failed: {source}")]
    Migration {
        module: String,
        id: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl DbError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DbError::Timeout { .. })
    }
}
