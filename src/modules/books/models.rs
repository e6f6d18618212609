use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils;

/// Cover value meaning "this book has no cover".
pub const NO_COVER: &str = "default-cover.jpg";

/// A book in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Assigned at creation, never changes
    pub id: Uuid,
    pub title: String,
    pub author: String,
    /// Publication year
    pub year: i32,
    /// Cover image URL, or [`NO_COVER`]
    pub cover_url: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful mutation
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Years since publication.
    pub fn age(&self) -> i32 {
        utils::current_year() - self.year
    }

    pub fn has_cover(&self) -> bool {
        self.cover_url != NO_COVER
    }
}

/// Year as sent by clients: a JSON number, or a string when a catalog search
/// result is re-submitted. `1965.0` is kept as `Fractional` and accepted when
/// it is whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearInput {
    Number(i64),
    Fractional(f64),
    Text(String),
}

impl YearInput {
    /// Zero counts as absent on create, like an empty string.
    pub fn is_zero(&self) -> bool {
        match self {
            YearInput::Number(n) => *n == 0,
            YearInput::Fractional(f) => *f == 0.0,
            YearInput::Text(s) => s.is_empty(),
        }
    }
}

impl From<i32> for YearInput {
    fn from(year: i32) -> Self {
        YearInput::Number(i64::from(year))
    }
}

impl From<&str> for YearInput {
    fn from(year: &str) -> Self {
        YearInput::Text(year.to_string())
    }
}

/// Request model for creating a new book. Presence is checked by validation
/// rather than by deserialization so that a missing field is a 400 with a
/// stable message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<YearInput>,
    pub cover_url: Option<String>,
}

/// Request model for a partial update. Unknown fields (including `id`,
/// `createdAt` and `updatedAt`) are ignored; `null` means "not supplied".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<YearInput>,
    pub cover_url: Option<String>,
}
