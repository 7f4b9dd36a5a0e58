use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookRepository, RepositoryError};
use crate::modules::books::models::{Book, NewBook};

#[derive(Debug, Default)]
struct Shelf {
    last_id: i64,
    books: BTreeMap<i64, Book>,
}

impl Shelf {
    fn holds(&self, title: &str, author: &str, except: Option<i64>) -> bool {
        self.books
            .values()
            .any(|b| Some(b.id) != except && b.title == title && b.author == author)
    }
}

/// Process-local store. Contents are lost when the process exits.
///
/// The duplicate check and the write happen under one lock, so concurrent
/// creates of the same `(title, author)` cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryBookRepository {
    shelf: RwLock<Shelf>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
        Ok(self.shelf.read().await.books.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Book>, RepositoryError> {
        Ok(self.shelf.read().await.books.values().cloned().collect())
    }

    async fn exists_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self.shelf.read().await.holds(title, author, None))
    }

    async fn insert(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let mut shelf = self.shelf.write().await;
        if shelf.holds(&book.title, &book.author, None) {
            return Err(RepositoryError::Duplicate {
                title: book.title,
                author: book.author,
            });
        }

        shelf.last_id += 1;
        let stored = book.with_id(shelf.last_id);
        shelf.books.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, book: &Book) -> Result<bool, RepositoryError> {
        let mut shelf = self.shelf.write().await;
        if !shelf.books.contains_key(&book.id) {
            return Ok(false);
        }
        if shelf.holds(&book.title, &book.author, Some(book.id)) {
            return Err(RepositoryError::Duplicate {
                title: book.title.clone(),
                author: book.author.clone(),
            });
        }

        shelf.books.insert(book.id, book.clone());
        Ok(true)
    }

    async fn remove(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.shelf.write().await.books.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::contract;
    use super::*;

    #[tokio::test]
    async fn insert_assigns_fresh_ids() {
        contract::insert_assigns_fresh_ids(&InMemoryBookRepository::new()).await;
    }

    #[tokio::test]
    async fn find_and_list() {
        contract::find_and_list(&InMemoryBookRepository::new()).await;
    }

    #[tokio::test]
    async fn duplicates_are_rejected() {
        contract::duplicates_are_rejected(&InMemoryBookRepository::new()).await;
    }

    #[tokio::test]
    async fn update_and_remove() {
        contract::update_and_remove(&InMemoryBookRepository::new()).await;
    }

    #[tokio::test]
    async fn update_cannot_collide() {
        contract::update_cannot_collide(&InMemoryBookRepository::new()).await;
    }

    #[tokio::test]
    async fn concurrent_duplicate_inserts_store_one_row() {
        let repo = Arc::new(InMemoryBookRepository::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.insert(contract::new_book("1984", "Orwell")).await })
            })
            .collect();

        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                stored += 1;
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}
