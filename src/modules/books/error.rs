use shelf_db::DbError;
use shelf_http::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::validation::ValidationError;

/// Every way a record-store operation can fail.
///
/// `InvalidId` and `NotFound` stay apart here so callers and tests can tell a
/// malformed identifier from an unknown one; both become 404 over HTTP.
#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no book with id {0}")]
    NotFound(Uuid),

    #[error("'{0}' is not a valid book id")]
    InvalidId(String),

    #[error("{0}")]
    Timeout(DbError),

    #[error("storage failure: {0}")]
    Store(DbError),
}

impl From<DbError> for BookError {
    fn from(err: DbError) -> Self {
        if err.is_timeout() {
            BookError::Timeout(err)
        } else {
            BookError::Store(err)
        }
    }
}

impl From<rusqlite::Error> for BookError {
    fn from(err: rusqlite::Error) -> Self {
        BookError::Store(DbError::Sqlite(err))
    }
}

impl BookError {
    /// Map to an HTTP error. `rejected` is the message used when the client's
    /// data broke a field rule, e.g. "Error adding book".
    pub fn respond(self, rejected: &'static str) -> AppError {
        match self {
            BookError::Validation(err) if err.is_missing() => {
                AppError::bad_request("Missing required fields")
            }
            BookError::Validation(err) => AppError::bad_request_with(rejected, err.to_string()),
            BookError::NotFound(_) | BookError::InvalidId(_) => AppError::not_found("Book not found"),
            BookError::Timeout(err) => AppError::timeout("Database operation timed out", err.to_string()),
            BookError::Store(err) => AppError::server("Server error", err.to_string()),
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        err.respond("Invalid book data")
    }
}
