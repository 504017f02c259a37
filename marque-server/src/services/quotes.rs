//! Quotes nested under an owned book

use marque_common::db::quotes;
use marque_common::models::{NewQuote, Quote};
use marque_common::requests::QuoteRequest;
use marque_common::validation::{apply_nullable, read_request, Fields};
use marque_common::{Caller, Error, Result};
use sqlx::SqlitePool;
use tracing::debug;

use super::books::owned_book_id;

pub const NOT_FOUND: &str = "Quote not found for this book";

fn read_changes(fields: &Fields, creating: bool) -> Result<QuoteRequest> {
    let (request, mut errors) = read_request::<QuoteRequest>(fields)?;
    if creating {
        errors.require("content", &request.content);
    } else {
        errors.reject_null("content", &request.content);
    }
    errors.into_result()?;
    Ok(request)
}

async fn find(pool: &SqlitePool, book_id: i64, id: i64) -> Result<Quote> {
    quotes::find_for_book(pool, book_id, id)
        .await?
        .ok_or_else(|| Error::NotFound(NOT_FOUND.to_string()))
}

pub async fn list_quotes(pool: &SqlitePool, caller: Caller, book_id: i64) -> Result<Vec<Quote>> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    quotes::list_for_book(pool, book_id).await
}

pub async fn create_quote(
    pool: &SqlitePool,
    caller: Caller,
    book_id: i64,
    fields: &Fields,
) -> Result<Quote> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    let changes = read_changes(fields, true)?;

    let quote = quotes::insert_quote(
        pool,
        book_id,
        &NewQuote {
            content: changes.content.flatten().unwrap_or_default(),
            page_number: changes.page_number.flatten(),
            context: changes.context.flatten(),
        },
    )
    .await?;

    debug!("Quote {} added to book {}", quote.id, book_id);
    Ok(quote)
}

pub async fn get_quote(pool: &SqlitePool, caller: Caller, book_id: i64, id: i64) -> Result<Quote> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    find(pool, book_id, id).await
}

pub async fn update_quote(
    pool: &SqlitePool,
    caller: Caller,
    book_id: i64,
    id: i64,
    fields: &Fields,
) -> Result<Quote> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    let mut quote = find(pool, book_id, id).await?;
    let changes = read_changes(fields, false)?;

    if let Some(Some(content)) = changes.content {
        quote.content = content;
    }
    apply_nullable(changes.page_number, &mut quote.page_number);
    apply_nullable(changes.context, &mut quote.context);

    quotes::update_quote(pool, &quote).await
}

pub async fn delete_quote(pool: &SqlitePool, caller: Caller, book_id: i64, id: i64) -> Result<()> {
    let book_id = owned_book_id(pool, caller, book_id).await?;

    if !quotes::delete_quote(pool, book_id, id).await? {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }
    Ok(())
}
