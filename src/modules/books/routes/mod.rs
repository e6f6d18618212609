//! Collection Service: HTTP handlers delegating to [`BookStore`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use shelf_http::error::{ApiJson, AppError};

use super::models::{Book, CreateBook, UpdateBook};
use super::store::BookStore;

pub fn router(store: BookStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book).delete(clear_books))
        .route("/{id}", get(get_book).put(update_book).delete(remove_book))
        .with_state(store)
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub message: &'static str,
    pub book: Book,
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub message: &'static str,
    pub deleted: usize,
}

async fn list_books(State(store): State<BookStore>) -> Result<Json<Vec<Book>>, AppError> {
    let books = store.list_all().await?;
    Ok(Json(books))
}

async fn get_book(
    State(store): State<BookStore>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let book = store.get_by_id(&id).await?;
    Ok(Json(book))
}

async fn create_book(
    State(store): State<BookStore>,
    ApiJson(input): ApiJson<CreateBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = store
        .create(input)
        .await
        .map_err(|e| e.respond("Error adding book"))?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(store): State<BookStore>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<UpdateBook>,
) -> Result<Json<Book>, AppError> {
    let book = store
        .update_by_id(&id, changes)
        .await
        .map_err(|e| e.respond("Error updating book"))?;
    Ok(Json(book))
}

async fn remove_book(
    State(store): State<BookStore>,
    Path(id): Path<String>,
) -> Result<Json<Removed>, AppError> {
    let book = store.delete_by_id(&id).await?;
    Ok(Json(Removed {
        message: "Book removed",
        book,
    }))
}

async fn clear_books(State(store): State<BookStore>) -> Result<Json<Cleared>, AppError> {
    let deleted = store.delete_all().await?;
    Ok(Json(Cleared {
        message: "All books deleted",
        deleted,
    }))
}
