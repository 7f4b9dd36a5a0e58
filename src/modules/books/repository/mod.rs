//! Storage boundary for books.
//!
//! [`BookRepository`] is the only thing the service layer sees. Two adapters
//! implement it: [`SqliteBookRepository`] for the file-backed store and
//! [`InMemoryBookRepository`] for transient runs and tests. Both keep
//! `(title, author)` unique and never reuse an id.

mod memory;
mod sqlite;

pub use memory::InMemoryBookRepository;
pub use sqlite::SqliteBookRepository;

use async_trait::async_trait;

use super::models::{Book, NewBook};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("book '{title}' by '{author}' already exists")]
    Duplicate { title: String, author: String },

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepositoryError>;

    /// Every stored book, ascending by id.
    async fn find_all(&self) -> Result<Vec<Book>, RepositoryError>;

    async fn exists_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> Result<bool, RepositoryError>;

    /// Store a new book and return it with its assigned id.
    async fn insert(&self, book: NewBook) -> Result<Book, RepositoryError>;

    /// Overwrite the row with `book.id`. Returns false when no such row exists.
    async fn update(&self, book: &Book) -> Result<bool, RepositoryError>;

    /// Returns false when no row had this id.
    async fn remove(&self, id: i64) -> Result<bool, RepositoryError>;
}
