//! Bookmarks nested under an owned book

use marque_common::db::bookmarks;
use marque_common::models::{Bookmark, NewBookmark};
use marque_common::requests::BookmarkRequest;
use marque_common::validation::{apply_nullable, read_request, Fields};
use marque_common::{Caller, Error, Result};
use sqlx::SqlitePool;
use tracing::debug;

use super::books::owned_book_id;

pub const NOT_FOUND: &str = "Bookmark not found for this book";

fn read_changes(fields: &Fields, creating: bool) -> Result<BookmarkRequest> {
    let (request, mut errors) = read_request::<BookmarkRequest>(fields)?;
    if creating {
        errors.require("page_number", &request.page_number);
    } else {
        errors.reject_null("page_number", &request.page_number);
    }
    errors.into_result()?;
    Ok(request)
}

async fn find(pool: &SqlitePool, book_id: i64, id: i64) -> Result<Bookmark> {
    bookmarks::find_for_book(pool, book_id, id)
        .await?
        .ok_or_else(|| Error::NotFound(NOT_FOUND.to_string()))
}

pub async fn list_bookmarks(pool: &SqlitePool, caller: Caller, book_id: i64) -> Result<Vec<Bookmark>> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    bookmarks::list_for_book(pool, book_id).await
}

pub async fn create_bookmark(
    pool: &SqlitePool,
    caller: Caller,
    book_id: i64,
    fields: &Fields,
) -> Result<Bookmark> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    let changes = read_changes(fields, true)?;

    let bookmark = bookmarks::insert_bookmark(
        pool,
        book_id,
        &NewBookmark {
            page_number: changes.page_number.flatten().unwrap_or(1),
            color: changes.color.flatten(),
            note: changes.note.flatten(),
        },
    )
    .await?;

    debug!("Book {} bookmarked at page {}", book_id, bookmark.page_number);
    Ok(bookmark)
}

pub async fn get_bookmark(pool: &SqlitePool, caller: Caller, book_id: i64, id: i64) -> Result<Bookmark> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    find(pool, book_id, id).await
}

pub async fn update_bookmark(
    pool: &SqlitePool,
    caller: Caller,
    book_id: i64,
    id: i64,
    fields: &Fields,
) -> Result<Bookmark> {
    let book_id = owned_book_id(pool, caller, book_id).await?;
    let mut bookmark = find(pool, book_id, id).await?;
    let changes = read_changes(fields, false)?;

    if let Some(Some(page)) = changes.page_number {
        bookmark.page_number = page;
    }
    apply_nullable(changes.color, &mut bookmark.color);
    apply_nullable(changes.note, &mut bookmark.note);

    bookmarks::update_bookmark(pool, &bookmark).await
}

pub async fn delete_bookmark(pool: &SqlitePool, caller: Caller, book_id: i64, id: i64) -> Result<()> {
    let book_id = owned_book_id(pool, caller, book_id).await?;

    if !bookmarks::delete_bookmark(pool, book_id, id).await? {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bookmark_validation() {
        let fields = json!({"page_number": 0, "color": "red", "note": "x".repeat(1001)});
        let Some(fields) = fields.as_object() else {
            panic!("object expected");
        };

        let Err(Error::Validation(errors)) = read_changes(fields, true) else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.messages("page_number"),
            ["The page number field must be at least 1."]
        );
        assert_eq!(errors.messages("color"), ["The color field format is invalid."]);
        assert!(errors.contains("note"));
    }

    #[test]
    fn test_page_number_required_on_create_only() {
        let empty = serde_json::Map::new();
        assert!(read_changes(&empty, true).is_err());
        assert!(read_changes(&empty, false).is_ok());

        let fields = json!({"page_number": null, "note": null});
        let Some(fields) = fields.as_object() else {
            panic!("object expected");
        };
        let Err(Error::Validation(errors)) = read_changes(fields, false) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["page_number"]);
    }
}
