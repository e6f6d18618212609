//! Durable book records on top of [`shelf_db::Database`].

use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use shelf_db::Database;
use shelf_kernel::Migration;
use uuid::Uuid;

use super::error::BookError;
use super::models::{Book, CreateBook, UpdateBook};
use super::validation;
use crate::utils;

/// Migrations owned by the books module.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_books",
        up: r#"
            CREATE TABLE books (
                seq        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT    NOT NULL UNIQUE,
                title      TEXT    NOT NULL CHECK (length(trim(title)) BETWEEN 1 AND 100),
                author     TEXT    NOT NULL CHECK (length(trim(author)) BETWEEN 1 AND 100),
                year       INTEGER NOT NULL CHECK (year >= 1000),
                cover_url  TEXT    NOT NULL DEFAULT 'default-cover.jpg',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX books_newest_first ON books (created_at DESC, seq DESC);
            "#,
    }]
}

const COLUMNS: &str = "id, title, author, year, cover_url, created_at, updated_at";

/// Record store for the collection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BookStore {
    db: Database,
}

impl BookStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Validate and persist a new record.
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn create(&self, input: CreateBook) -> Result<Book, BookError> {
        let (title, author, year, cover_url) = validation::validate_create(input)?.into_parts();
        let now = utils::now();
        let book = Book {
            id: Uuid::now_v7(),
            title,
            author,
            year,
            cover_url,
            created_at: now,
            updated_at: now,
        };

        let row = book.clone();
        self.db
            .call("books.create", move |conn| {
                conn.execute(
                    "INSERT INTO books (id, title, author, year, cover_url, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        row.id.to_string(),
                        row.title,
                        row.author,
                        row.year,
                        row.cover_url,
                        row.created_at.timestamp_micros(),
                        row.updated_at.timestamp_micros(),
                    ],
                )?;
                Ok::<_, BookError>(())
            })
            .await?;

        tracing::info!(id = %book.id, title = %book.title, "book added");
        Ok(book)
    }

    /// Every record, newest first.
    pub async fn list_all(&self) -> Result<Vec<Book>, BookError> {
        self.db
            .call("books.list", |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM books ORDER BY created_at DESC, seq DESC"
                ))?;
                let books = stmt
                    .query_map([], book_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, BookError>(books)
            })
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Book, BookError> {
        let id = parse_id(id)?;
        self.db
            .call("books.get", move |conn| fetch(conn, id))
            .await
    }

    /// Apply the supplied fields, re-check the merged record and refresh
    /// `updated_at`, all in one transaction.
    #[tracing::instrument(skip(self, changes), level = "debug")]
    pub async fn update_by_id(&self, id: &str, changes: UpdateBook) -> Result<Book, BookError> {
        let id = parse_id(id)?;
        let patch = validation::validate_update(changes)?;
        let max_year = utils::current_year();
        let now = utils::now();

        let book = self
            .db
            .call("books.update", move |conn| {
                let tx = conn.transaction()?;
                let mut book = fetch(&tx, id)?;

                patch.apply(&mut book);
                validation::check_book(&book, max_year)?;
                book.updated_at = now.max(book.created_at);

                tx.execute(
                    "UPDATE books
                     SET title = ?2, author = ?3, year = ?4, cover_url = ?5, updated_at = ?6
                     WHERE id = ?1",
                    params![
                        book.id.to_string(),
                        book.title,
                        book.author,
                        book.year,
                        book.cover_url,
                        book.updated_at.timestamp_micros(),
                    ],
                )?;
                tx.commit()?;
                Ok::<_, BookError>(book)
            })
            .await?;

        tracing::info!(id = %book.id, "book updated");
        Ok(book)
    }

    /// Remove a record and hand back what was removed.
    pub async fn delete_by_id(&self, id: &str) -> Result<Book, BookError> {
        let id = parse_id(id)?;
        let book = self
            .db
            .call("books.delete", move |conn| {
                let tx = conn.transaction()?;
                let book = fetch(&tx, id)?;
                tx.execute("DELETE FROM books WHERE id = ?1", params![id.to_string()])?;
                tx.commit()?;
                Ok::<_, BookError>(book)
            })
            .await?;

        tracing::info!(id = %book.id, "book removed");
        Ok(book)
    }

    /// Remove every record. Irreversible. Returns how many were removed.
    pub async fn delete_all(&self) -> Result<usize, BookError> {
        let removed = self
            .db
            .call("books.clear", |conn| {
                Ok::<_, BookError>(conn.execute("DELETE FROM books", [])?)
            })
            .await?;

        tracing::warn!(removed, "collection cleared");
        Ok(removed)
    }

    pub async fn count(&self) -> Result<usize, BookError> {
        self.db
            .call("books.count", |conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
                Ok::<_, BookError>(count as usize)
            })
            .await
    }
}

fn parse_id(raw: &str) -> Result<Uuid, BookError> {
    Uuid::parse_str(raw.trim()).map_err(|_| BookError::InvalidId(raw.to_string()))
}

fn fetch(conn: &Connection, id: Uuid) -> Result<Book, BookError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM books WHERE id = ?1"),
        params![id.to_string()],
        book_from_row,
    )
    .optional()?
    .ok_or(BookError::NotFound(id))
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(Book {
        id,
        title: row.get(1)?,
        author: row.get(2)?,
        year: row.get(3)?,
        cover_url: row.get(4)?,
        created_at: micros(row, 5)?,
        updated_at: micros(row, 6)?,
    })
}

fn micros(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(value).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, value))
}
