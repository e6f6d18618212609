pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_db::Database;
use shelf_kernel::{InitCtx, Migration, Module};

pub use error::BookError;
pub use models::{Book, CreateBook, UpdateBook, YearInput, NO_COVER};
pub use store::BookStore;

/// The personal collection: record store plus its CRUD endpoints.
pub struct BooksModule {
    store: BookStore,
}

impl BooksModule {
    pub fn new(db: Database) -> Self {
        Self {
            store: BookStore::new(db),
        }
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count = self.store.count().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = count,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        store::migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over an already opened database.
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(db))
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    });
    let book_input = |schema: &str| {
        serde_json::json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": format!("#/components/schemas/{schema}") }
                }
            }
        })
    };

    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books, newest first",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "Every book in the collection",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error_response("Server error")
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "requestBody": book_input("CreateBook"),
                    "responses": {
                        "201": book_response("Created book"),
                        "400": error_response("Missing or invalid fields"),
                        "500": error_response("Server error")
                    }
                },
                "delete": {
                    "summary": "Remove every book",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "Number of removed books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "message": { "type": "string" },
                                            "deleted": { "type": "integer" }
                                        }
                                    }
                                }
                            }
                        },
                        "500": error_response("Server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found"),
                        "500": error_response("Server error")
                    }
                },
                "put": {
                    "summary": "Change some fields of a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": book_input("UpdateBook"),
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("Invalid fields"),
                        "404": error_response("Book not found"),
                        "500": error_response("Server error")
                    }
                },
                "delete": {
                    "summary": "Remove a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": {
                            "description": "Removed book",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "message": { "type": "string" },
                                            "book": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        },
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "title": { "type": "string", "maxLength": 100 },
                        "author": { "type": "string", "maxLength": 100 },
                        "year": { "type": "integer", "minimum": 1000 },
                        "coverUrl": { "type": "string", "default": NO_COVER },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "author", "year", "coverUrl", "createdAt", "updatedAt"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "oneOf": [{ "type": "integer" }, { "type": "string" }] },
                        "coverUrl": { "type": "string" }
                    },
                    "required": ["title", "author", "year"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "oneOf": [{ "type": "integer" }, { "type": "string" }] },
                        "coverUrl": { "type": "string" }
                    }
                }
            }
        }
    })
}
