//! HTTP handlers for `/api/books`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use library_http::error::AppError;
use serde_json::json;

use super::models::BookDto;
use super::service::{BookService, BookServiceError};

const MISSING_PAYLOAD: &str = "Book data must not be null.";

pub fn router(service: Arc<BookService>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .with_state(service)
}

impl From<BookServiceError> for AppError {
    fn from(err: BookServiceError) -> Self {
        match err {
            BookServiceError::MissingPayload => AppError::bad_request(MISSING_PAYLOAD),
            BookServiceError::Invalid(violations) => AppError::validation(
                violations
                    .iter()
                    .map(|v| json!({ "field": v.field, "message": v.message }))
                    .collect(),
                "Book data is invalid.",
            ),
            BookServiceError::AlreadyExists { title, author } => AppError::conflict(
                vec![json!({ "title": title, "author": author })],
                "Book already exists.",
            ),
            BookServiceError::Store(source) => AppError::Internal(source.into()),
        }
    }
}

/// Decode a request body that may be empty or a JSON `null`.
fn parse_payload(body: &Bytes) -> Result<Option<BookDto>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<BookDto>>(body)
        .map_err(|e| AppError::bad_request(format!("malformed book payload: {}", e)))
}

/// Ids that are not integers in range match no book.
fn book_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!(error = %rejection, "book id rejected");
        AppError::not_found("Book not found.")
    })
}

fn location_of(id: i64) -> String {
    format!("{}/{}", library_http::router::module_base_path(super::MODULE_NAME), id)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(service): State<Arc<BookService>>,
) -> Result<Json<Vec<BookDto>>, AppError> {
    Ok(Json(service.list_all().await?))
}

async fn get_book(
    State(service): State<Arc<BookService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let id = book_id(path)?;
    Ok(match service.get_by_id(id).await? {
        Some(book) => Json(book).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

async fn create_book(
    State(service): State<Arc<BookService>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let payload = parse_payload(&body)?;
    let created = service.create(payload).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location_of(created.id))],
        Json(created),
    )
        .into_response())
}

async fn update_book(
    State(service): State<Arc<BookService>>,
    path: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let id = book_id(path)?;
    let payload = parse_payload(&body)?.ok_or_else(|| AppError::bad_request(MISSING_PAYLOAD))?;

    Ok(if service.update(id, payload).await? {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    })
}

async fn delete_book(
    State(service): State<Arc<BookService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = book_id(path)?;
    Ok(if service.delete(id).await? {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_null_bodies_are_absent() {
        assert_eq!(parse_payload(&Bytes::new()).unwrap(), None);
        assert_eq!(parse_payload(&Bytes::from_static(b" \n")).unwrap(), None);
        assert_eq!(parse_payload(&Bytes::from_static(b"null")).unwrap(), None);
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        let err = parse_payload(&Bytes::from_static(b"{\"title\":")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn location_points_at_the_book() {
        assert_eq!(location_of(12), "/api/books/12");
    }

    #[test]
    fn store_failures_become_internal_errors() {
        let err: AppError = BookServiceError::Store(
            super::super::repository::RepositoryError::Database(sqlx::Error::PoolTimedOut),
        )
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
