//! SQLite-backed book repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{BookRepository, RepositoryError};
use crate::modules::books::models::{Book, NewBook};

const SELECT_BOOK: &str = "SELECT id, title, author, genre, published_year FROM books";

/// SQLite implementation of [`BookRepository`].
///
/// Each call runs as its own implicit transaction on a pooled connection.
/// Uniqueness of `(title, author)` is enforced by the `books_title_author`
/// index, so a create that races past the existence check still fails
/// with [`RepositoryError::Duplicate`].
#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
        let book = sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_all(&self) -> Result<Vec<Book>, RepositoryError> {
        let books = sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn exists_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> Result<bool, RepositoryError> {
        let (found,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM books WHERE title = ? AND author = ?)",
        )
        .bind(title)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;
        Ok(found != 0)
    }

    async fn insert(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (title, author, genre, published_year)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.published_year)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, &book.title, &book.author))?;

        Ok(book.with_id(result.last_insert_rowid()))
    }

    async fn update(&self, book: &Book) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = ?, author = ?, genre = ?, published_year = ?
            WHERE id = ?
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.published_year)
        .bind(book.id)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, &book.title, &book.author))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn duplicate_or(err: sqlx::Error, title: &str, author: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::Duplicate {
                title: title.to_string(),
                author: author.to_string(),
            }
        }
        _ => RepositoryError::Database(err),
    }
}
