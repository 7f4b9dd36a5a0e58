use serde::{Deserialize, Serialize};

pub const TITLE_MAX_LEN: usize = 200;
pub const AUTHOR_MAX_LEN: usize = 100;
pub const GENRE_MAX_LEN: usize = 50;

/// Stored book row. `id` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    /// Store-assigned identifier, unique and positive
    pub id: i64,
    /// Title of the book, at most 200 characters
    pub title: String,
    /// Author of the book, at most 100 characters
    pub author: String,
    /// Optional genre, at most 50 characters
    pub genre: Option<String>,
    /// Year of first publication
    pub published_year: i32,
}

/// Book fields before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Optional genre
    pub genre: Option<String>,
    /// Year of first publication
    pub published_year: i32,
}

/// Wire representation used for request payloads and responses.
///
/// `id` is ignored on create and on update (the path id is authoritative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    /// Identifier of a stored book; defaults to 0 on input
    #[serde(default)]
    pub id: i64,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Optional genre; omitted and `null` both mean none
    #[serde(default)]
    pub genre: Option<String>,
    /// Year of first publication, sent as `publishedYear`
    pub published_year: i32,
}

/// One rejected field of a [`BookDto`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Wire name of the offending field
    pub field: &'static str,
    /// Why the value was rejected
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl BookDto {
    /// Check required fields and column length limits.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();

        check_text(&mut violations, "title", &self.title, TITLE_MAX_LEN, true);
        check_text(&mut violations, "author", &self.author, AUTHOR_MAX_LEN, true);
        if let Some(genre) = &self.genre {
            check_text(&mut violations, "genre", genre, GENRE_MAX_LEN, false);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn into_new_book(self) -> NewBook {
        NewBook {
            title: self.title,
            author: self.author,
            genre: self.genre,
            published_year: self.published_year,
        }
    }

    /// Overwrite every mutable field of `book`; the id is left untouched.
    pub fn apply_to(self, book: &mut Book) {
        book.title = self.title;
        book.author = self.author;
        book.genre = self.genre;
        book.published_year = self.published_year;
    }
}

fn check_text(
    violations: &mut Vec<FieldViolation>,
    field: &'static str,
    value: &str,
    max_len: usize,
    required: bool,
) {
    if required && value.trim().is_empty() {
        violations.push(FieldViolation::new(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len > max_len {
        violations.push(FieldViolation::new(
            field,
            format!("must be at most {} characters (got {})", max_len, len),
        ));
    }
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            published_year: book.published_year,
        }
    }
}

impl NewBook {
    pub fn with_id(self, id: i64) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            genre: self.genre,
            published_year: self.published_year,
        }
    }
}
