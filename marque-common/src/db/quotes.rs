//! Quote rows, newest first

use std::collections::HashMap;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{NewQuote, Quote};
use crate::Result;

const COLUMNS: &str = "id, book_id, content, page_number, context, created_at, updated_at";

fn quote_from_row(row: &SqliteRow) -> Result<Quote> {
    Ok(Quote {
        id: row.try_get("id")?,
        book_id: row.try_get("book_id")?,
        content: row.try_get("content")?,
        page_number: row.try_get("page_number")?,
        context: row.try_get("context")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn list_for_book(pool: &SqlitePool, book_id: i64) -> Result<Vec<Quote>> {
    let sql = format!(
        "SELECT {} FROM quotes WHERE book_id = ? ORDER BY created_at DESC, id DESC",
        COLUMNS
    );
    let rows = sqlx::query(&sql).bind(book_id).fetch_all(pool).await?;

    rows.iter().map(quote_from_row).collect()
}

/// Quotes of several books at once, grouped by book id
pub async fn list_for_books(
    pool: &SqlitePool,
    book_ids: &[i64],
) -> Result<HashMap<i64, Vec<Quote>>> {
    let mut grouped: HashMap<i64, Vec<Quote>> = HashMap::new();
    if book_ids.is_empty() {
        return Ok(grouped);
    }

    let placeholders = vec!["?"; book_ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM quotes WHERE book_id IN ({}) ORDER BY created_at DESC, id DESC",
        COLUMNS, placeholders
    );

    let mut query = sqlx::query(&sql);
    for id in book_ids {
        query = query.bind(*id);
    }

    for row in query.fetch_all(pool).await? {
        let quote = quote_from_row(&row)?;
        grouped.entry(quote.book_id).or_default().push(quote);
    }

    Ok(grouped)
}

pub async fn find_for_book(pool: &SqlitePool, book_id: i64, id: i64) -> Result<Option<Quote>> {
    let sql = format!("SELECT {} FROM quotes WHERE id = ? AND book_id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(quote_from_row).transpose()
}

pub async fn insert_quote(pool: &SqlitePool, book_id: i64, quote: &NewQuote) -> Result<Quote> {
    let now = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO quotes (book_id, content, page_number, context, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(book_id)
    .bind(&quote.content)
    .bind(quote.page_number)
    .bind(&quote.context)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Quote {
        id,
        book_id,
        content: quote.content.clone(),
        page_number: quote.page_number,
        context: quote.context.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn update_quote(pool: &SqlitePool, quote: &Quote) -> Result<Quote> {
    let now = Utc::now();

    sqlx::query(
        "UPDATE quotes SET content = ?, page_number = ?, context = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&quote.content)
    .bind(quote.page_number)
    .bind(&quote.context)
    .bind(now)
    .bind(quote.id)
    .execute(pool)
    .await?;

    Ok(Quote {
        updated_at: now,
        ..quote.clone()
    })
}

pub async fn delete_quote(pool: &SqlitePool, book_id: i64, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM quotes WHERE id = ? AND book_id = ?")
        .bind(id)
        .bind(book_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
