//! Bookmark rows
//!
//! Ownership is checked by the caller (via the parent book); these
//! functions only scope by `book_id`.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{Bookmark, NewBookmark};
use crate::Result;

const COLUMNS: &str = "id, book_id, page_number, color, note, created_at, updated_at";

fn bookmark_from_row(row: &SqliteRow) -> Result<Bookmark> {
    Ok(Bookmark {
        id: row.try_get("id")?,
        book_id: row.try_get("book_id")?,
        page_number: row.try_get("page_number")?,
        color: row.try_get("color")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Bookmarks of one book ordered by page number
pub async fn list_for_book(pool: &SqlitePool, book_id: i64) -> Result<Vec<Bookmark>> {
    let sql = format!(
        "SELECT {} FROM bookmarks WHERE book_id = ? ORDER BY page_number ASC, id ASC",
        COLUMNS
    );
    let rows = sqlx::query(&sql).bind(book_id).fetch_all(pool).await?;

    rows.iter().map(bookmark_from_row).collect()
}

/// Bookmarks of several books at once, grouped by book id
///
/// Books without bookmarks are absent from the map.
pub async fn list_for_books(
    pool: &SqlitePool,
    book_ids: &[i64],
) -> Result<HashMap<i64, Vec<Bookmark>>> {
    let mut grouped: HashMap<i64, Vec<Bookmark>> = HashMap::new();
    if book_ids.is_empty() {
        return Ok(grouped);
    }

    let placeholders = vec!["?"; book_ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM bookmarks WHERE book_id IN ({}) ORDER BY page_number ASC, id ASC",
        COLUMNS, placeholders
    );

    let mut query = sqlx::query(&sql);
    for id in book_ids {
        query = query.bind(*id);
    }

    for row in query.fetch_all(pool).await? {
        let bookmark = bookmark_from_row(&row)?;
        grouped.entry(bookmark.book_id).or_default().push(bookmark);
    }

    Ok(grouped)
}

/// Bookmark `id` if it belongs to `book_id`
pub async fn find_for_book(pool: &SqlitePool, book_id: i64, id: i64) -> Result<Option<Bookmark>> {
    let sql = format!("SELECT {} FROM bookmarks WHERE id = ? AND book_id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(bookmark_from_row).transpose()
}

pub async fn insert_bookmark(
    pool: &SqlitePool,
    book_id: i64,
    bookmark: &NewBookmark,
) -> Result<Bookmark> {
    let now = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO bookmarks (book_id, page_number, color, note, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(book_id)
    .bind(bookmark.page_number)
    .bind(&bookmark.color)
    .bind(&bookmark.note)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Bookmark {
        id,
        book_id,
        page_number: bookmark.page_number,
        color: bookmark.color.clone(),
        note: bookmark.note.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Write the mutable columns of `bookmark` and stamp `updated_at`
pub async fn update_bookmark(pool: &SqlitePool, bookmark: &Bookmark) -> Result<Bookmark> {
    let now = Utc::now();

    sqlx::query(
        "UPDATE bookmarks SET page_number = ?, color = ?, note = ?, updated_at = ? WHERE id = ?",
    )
    .bind(bookmark.page_number)
    .bind(&bookmark.color)
    .bind(&bookmark.note)
    .bind(now)
    .bind(bookmark.id)
    .execute(pool)
    .await?;

    Ok(Bookmark {
        updated_at: now,
        ..bookmark.clone()
    })
}

pub async fn delete_bookmark(pool: &SqlitePool, book_id: i64, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bookmarks WHERE id = ? AND book_id = ?")
        .bind(id)
        .bind(book_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
