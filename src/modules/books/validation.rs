//! Field rules for book records.
//!
//! Every write goes through one of these functions before anything touches
//! the database; the returned [`NewBook`] / [`BookPatch`] can only be built
//! here, so the store cannot be handed unchecked data.

use std::fmt;

use thiserror::Error;

use super::models::{Book, CreateBook, UpdateBook, YearInput, NO_COVER};
use crate::utils;

pub const MAX_TEXT_CHARS: usize = 100;
pub const MIN_YEAR: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Author,
    Year,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Title => "title",
            Field::Author => "author",
            Field::Year => "year",
        })
    }
}

/// Which rule a value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Absent (or an empty string) on create
    Missing,
    /// Empty after trimming
    Blank,
    TooLong,
    NotAWholeNumber,
    TooEarly,
    InFuture,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.field, .constraint))]
pub struct ValidationError {
    pub field: Field,
    pub constraint: Constraint,
}

impl ValidationError {
    fn new(field: Field, constraint: Constraint) -> Self {
        Self { field, constraint }
    }

    pub fn is_missing(&self) -> bool {
        self.constraint == Constraint::Missing
    }
}

fn describe(field: &Field, constraint: &Constraint) -> String {
    match (*field, *constraint) {
        (Field::Title, Constraint::Missing | Constraint::Blank) => "Book title is required".into(),
        (Field::Author, Constraint::Missing | Constraint::Blank) => {
            "Author name is required".into()
        }
        (Field::Year, Constraint::Missing | Constraint::Blank) => {
            "Publication year is required".into()
        }
        (Field::Title, Constraint::TooLong) => {
            format!("Title cannot be more than {MAX_TEXT_CHARS} characters")
        }
        (Field::Author, Constraint::TooLong) => {
            format!("Author name cannot be more than {MAX_TEXT_CHARS} characters")
        }
        (Field::Year, Constraint::NotAWholeNumber) => "Year must be a whole number".into(),
        (Field::Year, Constraint::TooEarly) => format!("Year must be at least {MIN_YEAR}"),
        (Field::Year, Constraint::InFuture) => "Year cannot be in the future".into(),
        (field, constraint) => format!("{field} violates {constraint:?}"),
    }
}

/// Checked input for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    title: String,
    author: String,
    year: i32,
    cover_url: String,
}

impl NewBook {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn cover_url(&self) -> &str {
        &self.cover_url
    }

    pub(crate) fn into_parts(self) -> (String, String, i32, String) {
        (self.title, self.author, self.year, self.cover_url)
    }
}

/// Checked subset of fields to change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    title: Option<String>,
    author: Option<String>,
    year: Option<i32>,
    cover_url: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.year.is_none() && self.cover_url.is_none()
    }

    /// Merge into `book`. Does not touch timestamps or the id.
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(cover_url) = self.cover_url {
            book.cover_url = cover_url;
        }
    }
}

/// Validate a create request against the current calendar year.
pub fn validate_create(input: CreateBook) -> Result<NewBook, ValidationError> {
    validate_create_until(input, utils::current_year())
}

/// Validate a create request with an explicit latest allowed year.
pub fn validate_create_until(input: CreateBook, max_year: i32) -> Result<NewBook, ValidationError> {
    // Presence is reported before any other rule, for all three fields.
    let title = present(Field::Title, input.title)?;
    let author = present(Field::Author, input.author)?;
    let year = input
        .year
        .filter(|year| !year.is_zero())
        .ok_or(ValidationError::new(Field::Year, Constraint::Missing))?;

    Ok(NewBook {
        title: text(Field::Title, &title)?,
        author: text(Field::Author, &author)?,
        year: year_in_range(&year, max_year)?,
        cover_url: cover(input.cover_url.as_deref()),
    })
}

/// Validate only the fields an update supplies.
pub fn validate_update(input: UpdateBook) -> Result<BookPatch, ValidationError> {
    validate_update_until(input, utils::current_year())
}

pub fn validate_update_until(input: UpdateBook, max_year: i32) -> Result<BookPatch, ValidationError> {
    Ok(BookPatch {
        title: input
            .title
            .map(|value| text(Field::Title, &value))
            .transpose()?,
        author: input
            .author
            .map(|value| text(Field::Author, &value))
            .transpose()?,
        year: input
            .year
            .map(|value| year_in_range(&value, max_year))
            .transpose()?,
        cover_url: input.cover_url.as_deref().map(|value| cover(Some(value))),
    })
}

/// Re-check a whole record, e.g. after merging a patch.
pub fn check_book(book: &Book, max_year: i32) -> Result<(), ValidationError> {
    text(Field::Title, &book.title)?;
    text(Field::Author, &book.author)?;
    year_in_range(&YearInput::from(book.year), max_year)?;
    Ok(())
}

fn present(field: Field, value: Option<String>) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::new(field, Constraint::Missing))
}

fn text(field: Field, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, Constraint::Blank));
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(ValidationError::new(field, Constraint::TooLong));
    }
    Ok(trimmed.to_string())
}

fn year_in_range(value: &YearInput, max_year: i32) -> Result<i32, ValidationError> {
    let year = match value {
        YearInput::Number(n) => *n,
        YearInput::Fractional(f) => {
            if !f.is_finite() || f.fract() != 0.0 {
                return Err(ValidationError::new(Field::Year, Constraint::NotAWholeNumber));
            }
            if *f < i64::MIN as f64 || *f > i64::MAX as f64 {
                return Err(ValidationError::new(Field::Year, Constraint::NotAWholeNumber));
            }
            *f as i64
        }
        YearInput::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(ValidationError::new(Field::Year, Constraint::Blank));
            }
            s.parse::<i64>()
                .map_err(|_| ValidationError::new(Field::Year, Constraint::NotAWholeNumber))?
        }
    };

    if year < i64::from(MIN_YEAR) {
        return Err(ValidationError::new(Field::Year, Constraint::TooEarly));
    }
    if year > i64::from(max_year) {
        return Err(ValidationError::new(Field::Year, Constraint::InFuture));
    }
    // In range of [MIN_YEAR, max_year], so it fits.
    Ok(year as i32)
}

fn cover(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => NO_COVER.to_string(),
    }
}
