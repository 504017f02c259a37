//! Book rows
//!
//! Dynamic listing queries are assembled by the server's query builder;
//! it maps rows back through [`book_from_row`].

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{Book, NewBook, ReadingStatus};
use crate::{Error, Result};

/// Column list matching [`book_from_row`]
pub const BOOK_COLUMNS: &str = "id, user_id, title, author, isbn, description, genre, \
     total_pages, current_page, status, cover_image, started_at, completed_at, rating, \
     created_at, updated_at";

/// Lowercased copy stored alongside searchable text
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

pub fn book_from_row(row: &SqliteRow) -> Result<Book> {
    let status: String = row.try_get("status")?;
    let status: ReadingStatus = status.parse().map_err(Error::Internal)?;

    Ok(Book {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        isbn: row.try_get("isbn")?,
        description: row.try_get("description")?,
        genre: row.try_get("genre")?,
        total_pages: row.try_get("total_pages")?,
        current_page: row.try_get("current_page")?,
        status,
        cover_image: row.try_get("cover_image")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        rating: row.try_get("rating")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn insert_book(pool: &SqlitePool, user_id: i64, book: &NewBook) -> Result<Book> {
    let now = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO books (
            user_id, title, author, isbn, description, genre, total_pages,
            current_page, status, cover_image, started_at, completed_at, rating,
            created_at, updated_at, title_folded, author_folded, genre_folded
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.isbn)
    .bind(&book.description)
    .bind(&book.genre)
    .bind(book.total_pages)
    .bind(book.current_page)
    .bind(book.status.as_str())
    .bind(&book.cover_image)
    .bind(book.started_at)
    .bind(book.completed_at)
    .bind(book.rating)
    .bind(now)
    .bind(now)
    .bind(fold_case(&book.title))
    .bind(fold_case(&book.author))
    .bind(book.genre.as_deref().map(fold_case))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Book {
        id,
        user_id,
        title: book.title.clone(),
        author: book.author.clone(),
        isbn: book.isbn.clone(),
        description: book.description.clone(),
        genre: book.genre.clone(),
        total_pages: book.total_pages,
        current_page: book.current_page,
        status: book.status,
        cover_image: book.cover_image.clone(),
        started_at: book.started_at,
        completed_at: book.completed_at,
        rating: book.rating,
        created_at: now,
        updated_at: now,
    })
}

/// Book `id` if it belongs to `user_id`
pub async fn find_owned(pool: &SqlitePool, user_id: i64, id: i64) -> Result<Option<Book>> {
    let sql = format!("SELECT {} FROM books WHERE id = ? AND user_id = ?", BOOK_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(book_from_row).transpose()
}

/// Write every mutable column of `book` and stamp `updated_at`
///
/// Returns the stored record.
pub async fn update_book(pool: &SqlitePool, book: &Book) -> Result<Book> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE books SET
            title = ?, author = ?, isbn = ?, description = ?, genre = ?,
            total_pages = ?, current_page = ?, status = ?, cover_image = ?,
            started_at = ?, completed_at = ?, rating = ?, updated_at = ?,
            title_folded = ?, author_folded = ?, genre_folded = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.isbn)
    .bind(&book.description)
    .bind(&book.genre)
    .bind(book.total_pages)
    .bind(book.current_page)
    .bind(book.status.as_str())
    .bind(&book.cover_image)
    .bind(book.started_at)
    .bind(book.completed_at)
    .bind(book.rating)
    .bind(now)
    .bind(fold_case(&book.title))
    .bind(fold_case(&book.author))
    .bind(book.genre.as_deref().map(fold_case))
    .bind(book.id)
    .bind(book.user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Book"));
    }

    Ok(Book {
        updated_at: now,
        ..book.clone()
    })
}

/// Delete a book (annotations cascade); returns false if nothing matched
pub async fn delete_book(pool: &SqlitePool, user_id: i64, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM books WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
