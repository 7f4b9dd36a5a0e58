pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use library_kernel::{InitCtx, Migration, Module};

use repository::BookRepository;
use service::BookService;

pub const MODULE_NAME: &str = "books";

/// Book catalog module: CRUD endpoints mounted at `/api/books`.
pub struct BooksModule {
    service: Arc<BookService>,
}

impl BooksModule {
    pub fn new(service: Arc<BookService>) -> Self {
        Self { service }
    }
}

/// Schema for the SQLite store.
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    title          TEXT    NOT NULL CHECK (length(title) <= 200),
                    author         TEXT    NOT NULL CHECK (length(author) <= 100),
                    genre          TEXT             CHECK (genre IS NULL OR length(genre) <= 50),
                    published_year INTEGER NOT NULL
                );
                "#,
        },
        Migration {
            id: "002_title_author_unique",
            up: r#"
                CREATE UNIQUE INDEX IF NOT EXISTS books_title_author
                    ON books (title, author);
                "#,
        },
    ]
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            in_memory = ctx.settings.database.in_memory,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
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

fn id_parameter() -> serde_json::Value {
    serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn book_body() -> serde_json::Value {
    serde_json::json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "Every stored book, possibly none",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_body(),
                    "responses": {
                        "201": book_response("Created; Location points at the new book"),
                        "400": error_response("Missing, malformed, or invalid payload"),
                        "409": error_response("A book with this title and author exists")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Fetch a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": book_response("The book"),
                        "404": { "description": "No book with this id" }
                    }
                },
                "put": {
                    "summary": "Replace a book's fields",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": book_body(),
                    "responses": {
                        "204": { "description": "Updated" },
                        "400": error_response("Missing, malformed, or invalid payload"),
                        "404": { "description": "No book with this id" },
                        "409": error_response("Another book has this title and author")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": { "description": "No book with this id" }
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "integer",
                            "format": "int64",
                            "description": "Assigned by the store; ignored on input"
                        },
                        "title": { "type": "string", "maxLength": 200 },
                        "author": { "type": "string", "maxLength": 100 },
                        "genre": { "type": ["string", "null"], "maxLength": 50 },
                        "publishedYear": { "type": "integer", "format": "int32" }
                    },
                    "required": ["title", "author", "publishedYear"]
                }
            }
        }
    })
}

/// Build the books module on top of `repository`.
pub fn create_module(repository: Arc<dyn BookRepository>) -> Arc<dyn Module> {
    let service = Arc::new(BookService::new(repository));
    Arc::new(BooksModule::new(service))
}
