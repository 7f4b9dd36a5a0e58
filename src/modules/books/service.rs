//! Business rules for the book catalog: one store operation per call, a
//! duplicate check on create, and an existence check on update and delete.

use std::sync::Arc;

use super::models::{BookDto, FieldViolation};
use super::repository::{BookRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum BookServiceError {
    #[error("book payload is missing")]
    MissingPayload,

    #[error("book payload failed validation")]
    Invalid(Vec<FieldViolation>),

    #[error("book '{title}' by '{author}' already exists")]
    AlreadyExists { title: String, author: String },

    #[error("book store failure: {0}")]
    Store(#[source] RepositoryError),
}

impl From<RepositoryError> for BookServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate { title, author } => Self::AlreadyExists { title, author },
            other => Self::Store(other),
        }
    }
}

pub struct BookService {
    repository: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    /// All books in ascending id order; empty when the store is empty.
    pub async fn list_all(&self) -> Result<Vec<BookDto>, BookServiceError> {
        let books = self.repository.find_all().await?;
        tracing::debug!(count = books.len(), "listed books");
        Ok(books.into_iter().map(BookDto::from).collect())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<BookDto>, BookServiceError> {
        let book = self.repository.find_by_id(id).await?;
        tracing::debug!(book_id = id, found = book.is_some(), "looked up book");
        Ok(book.map(BookDto::from))
    }

    /// Store a new book and return it with the assigned id. The payload's
    /// own `id` is ignored.
    pub async fn create(&self, dto: Option<BookDto>) -> Result<BookDto, BookServiceError> {
        let dto = dto.ok_or(BookServiceError::MissingPayload)?;
        dto.validate().map_err(BookServiceError::Invalid)?;

        if self
            .repository
            .exists_by_title_author(&dto.title, &dto.author)
            .await?
        {
            tracing::warn!(title = %dto.title, author = %dto.author, "duplicate book rejected");
            return Err(BookServiceError::AlreadyExists {
                title: dto.title,
                author: dto.author,
            });
        }

        let stored = self.repository.insert(dto.into_new_book()).await?;
        tracing::info!(book_id = stored.id, title = %stored.title, "book created");
        Ok(stored.into())
    }

    /// Overwrite every mutable field of book `id`. Returns false when the
    /// book does not exist.
    pub async fn update(&self, id: i64, dto: BookDto) -> Result<bool, BookServiceError> {
        dto.validate().map_err(BookServiceError::Invalid)?;

        let Some(mut book) = self.repository.find_by_id(id).await? else {
            tracing::debug!(book_id = id, "update target missing");
            return Ok(false);
        };

        dto.apply_to(&mut book);
        let updated = self.repository.update(&book).await?;
        if updated {
            tracing::info!(book_id = id, "book updated");
        }
        Ok(updated)
    }

    /// Returns false when the book does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, BookServiceError> {
        let Some(book) = self.repository.find_by_id(id).await? else {
            tracing::debug!(book_id = id, "delete target missing");
            return Ok(false);
        };

        let removed = self.repository.remove(book.id).await?;
        if removed {
            tracing::info!(book_id = id, "book deleted");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::repository::InMemoryBookRepository;

    fn service() -> BookService {
        BookService::new(Arc::new(InMemoryBookRepository::new()))
    }

    fn dto(title: &str, author: &str, genre: &str, year: i32) -> BookDto {
        BookDto {
            id: 0,
            title: title.to_string(),
            author: author.to_string(),
            genre: Some(genre.to_string()),
            published_year: year,
        }
    }

    fn orwell() -> BookDto {
        dto("1984", "Orwell", "Dystopian", 1949)
    }

    fn herbert() -> BookDto {
        dto("Dune", "Herbert", "Sci-Fi", 1965)
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        assert!(service().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips() {
        let service = service();
        let mut payload = orwell();
        payload.id = 42;

        let created = service.create(Some(payload)).await.unwrap();
        assert!(created.id > 0);
        assert_ne!(created.id, 42, "client-supplied ids are ignored");

        let fetched = service.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "1984");
        assert_eq!(fetched.published_year, 1949);
    }

    #[tokio::test]
    async fn catalog_scenario() {
        let service = service();
        let first = service.create(Some(orwell())).await.unwrap();
        let second = service.create(Some(herbert())).await.unwrap();

        let titles: Vec<String> = service
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["1984", "Dune"]);
        assert_ne!(first.id, second.id);

        assert_eq!(
            service.get_by_id(first.id).await.unwrap().unwrap().title,
            "1984"
        );
        assert!(service.delete(first.id).await.unwrap());
        assert!(service.get_by_id(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_without_inserting() {
        let service = service();
        service.create(Some(orwell())).await.unwrap();

        let err = service.create(Some(orwell())).await.unwrap_err();
        assert!(matches!(err, BookServiceError::AlreadyExists { .. }));
        assert_eq!(service.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_title_by_another_author_is_allowed() {
        let service = service();
        service.create(Some(orwell())).await.unwrap();
        service
            .create(Some(dto("1984", "Someone Else", "Parody", 2001)))
            .await
            .unwrap();
        assert_eq!(service.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_payload_is_rejected() {
        let err = service().create(None).await.unwrap_err();
        assert!(matches!(err, BookServiceError::MissingPayload));
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected() {
        let service = service();
        let err = service
            .create(Some(dto("", "Orwell", "Dystopian", 1949)))
            .await
            .unwrap_err();
        match err {
            BookServiceError::Invalid(violations) => assert_eq!(violations[0].field, "title"),
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_signal_absence() {
        let service = service();
        assert!(service.get_by_id(999).await.unwrap().is_none());
        assert!(!service.update(999, orwell()).await.unwrap());
        assert!(!service.delete(999).await.unwrap());
    }

    #[tokio::test]
    async fn delete_twice_reports_true_then_false() {
        let service = service();
        let created = service.create(Some(orwell())).await.unwrap();
        assert!(service.delete(created.id).await.unwrap());
        assert!(!service.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_overwrites_every_field_and_keeps_id() {
        let service = service();
        let created = service.create(Some(orwell())).await.unwrap();

        let mut replacement = dto("Animal Farm", "George Orwell", "Satire", 1945);
        replacement.id = created.id + 7;
        assert!(service.update(created.id, replacement.clone()).await.unwrap());

        let fetched = service.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, replacement.title);
        assert_eq!(fetched.author, replacement.author);
        assert_eq!(fetched.genre, replacement.genre);
        assert_eq!(fetched.published_year, replacement.published_year);
    }

    #[tokio::test]
    async fn invalid_update_leaves_book_unchanged() {
        let service = service();
        let created = service.create(Some(orwell())).await.unwrap();

        let err = service
            .update(created.id, dto(" ", "Orwell", "Dystopian", 1950))
            .await
            .unwrap_err();
        match err {
            BookServiceError::Invalid(violations) => assert_eq!(violations[0].field, "title"),
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert_eq!(service.get_by_id(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn update_onto_existing_title_author_conflicts() {
        let service = service();
        service.create(Some(orwell())).await.unwrap();
        let dune = service.create(Some(herbert())).await.unwrap();

        let err = service.update(dune.id, orwell()).await.unwrap_err();
        assert!(matches!(err, BookServiceError::AlreadyExists { .. }));
    }
}
