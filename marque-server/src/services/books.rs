//! Book Record Manager
//!
//! Create, update, progress and delete operations on a caller's books.
//! Status and lifecycle-date derivation is delegated to
//! [`marque_common::progress`]. Cover-file side effects are sequenced
//! around the database writes here.

use marque_common::db::{bookmarks, books, quotes};
use marque_common::models::{Book, BookDetail, NewBook, ProgressSummary};
use marque_common::progress::{self, Lifecycle};
use marque_common::requests::{BookRequest, ProgressRequest};
use marque_common::validation::{apply_nullable, read_request, Fields};
use marque_common::{Caller, Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::today;
use crate::covers::{self, CoverUpload, COVER_FIELD};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
}

/// Validated book request, with the create/update presence rules and
/// upload checks applied
fn read_changes(
    fields: &Fields,
    cover: Option<&CoverUpload>,
    cover_limit_kb: u64,
    mode: Mode,
) -> Result<BookRequest> {
    let (mut request, mut errors) = read_request::<BookRequest>(fields)?;

    match mode {
        Mode::Create => {
            errors.require("title", &request.title);
            errors.require("author", &request.author);
        }
        Mode::Update => {
            errors.reject_null("title", &request.title);
            errors.reject_null("author", &request.author);
            // Lifecycle dates are write-once and only derived on update
            request.started_at = None;
            request.completed_at = None;
        }
    }

    if let Some(upload) = cover {
        for message in covers::upload_errors(upload, cover_limit_kb) {
            errors.add(COVER_FIELD, message);
        }
    }

    errors.into_result()?;
    Ok(request)
}

fn lifecycle_of(book: &Book) -> Lifecycle {
    Lifecycle {
        status: book.status,
        started_at: book.started_at,
        completed_at: book.completed_at,
    }
}

fn set_lifecycle(book: &mut Book, lifecycle: Lifecycle) {
    book.status = lifecycle.status;
    book.started_at = lifecycle.started_at;
    book.completed_at = lifecycle.completed_at;
}

/// Book `book_id` owned by the caller, or NotFound
pub async fn load_owned(pool: &SqlitePool, caller: Caller, book_id: i64) -> Result<Book> {
    books::find_owned(pool, caller.user_id, book_id)
        .await?
        .ok_or_else(|| Error::not_found("Book"))
}

/// Ownership check for nested resources
pub async fn owned_book_id(pool: &SqlitePool, caller: Caller, book_id: i64) -> Result<i64> {
    load_owned(pool, caller, book_id).await.map(|book| book.id)
}

async fn with_annotations(state: &AppState, book: Book) -> Result<BookDetail> {
    let marks = bookmarks::list_for_book(&state.db, book.id).await?;
    let quotes = quotes::list_for_book(&state.db, book.id).await?;
    Ok(BookDetail::new(book, marks, quotes))
}

/// Validate and insert a new book, storing its cover first if one was sent
pub async fn create_book(
    state: &AppState,
    caller: Caller,
    fields: &Fields,
    cover: Option<CoverUpload>,
) -> Result<BookDetail> {
    let request = read_changes(fields, cover.as_ref(), state.cover_limit_kb, Mode::Create)?;

    let lifecycle = progress::initial_lifecycle(
        request.status_change().flatten(),
        request.started_at.flatten(),
        request.completed_at.flatten(),
        today(),
    );

    let cover_image = match cover {
        Some(upload) => {
            debug!("Processing cover upload {:?}", upload.file_name);
            let processed = covers::prepare_cover(upload).await?;
            Some(covers::store_cover(state.covers.clone(), processed).await?)
        }
        None => None,
    };

    let new_book = NewBook {
        title: request.title.clone().flatten().unwrap_or_default(),
        author: request.author.clone().flatten().unwrap_or_default(),
        isbn: request.isbn.clone().flatten(),
        description: request.description_change().flatten(),
        genre: request.genre.clone().flatten(),
        total_pages: request.total_pages.flatten(),
        current_page: request.current_page.flatten().unwrap_or(0),
        status: lifecycle.status,
        cover_image: cover_image.clone(),
        started_at: lifecycle.started_at,
        completed_at: lifecycle.completed_at,
        rating: request.rating_change().flatten(),
    };

    let book = match books::insert_book(&state.db, caller.user_id, &new_book).await {
        Ok(book) => book,
        Err(e) => {
            if let Some(path) = cover_image {
                covers::delete_cover(state.covers.clone(), path).await;
            }
            return Err(e);
        }
    };

    info!(
        "User {} created book {} ({:?})",
        caller.user_id, book.id, book.title
    );
    Ok(BookDetail::new(book, Vec::new(), Vec::new()))
}

/// Owned book with bookmarks and quotes attached
pub async fn get_book(state: &AppState, caller: Caller, book_id: i64) -> Result<BookDetail> {
    let book = load_owned(&state.db, caller, book_id).await?;
    with_annotations(state, book).await
}

/// Partial update of an owned book
///
/// A replacement cover is decoded and resized before anything changes,
/// then stored, then the record is saved. The previous file is removed
/// only once the record no longer points at it.
pub async fn update_book(
    state: &AppState,
    caller: Caller,
    book_id: i64,
    fields: &Fields,
    cover: Option<CoverUpload>,
) -> Result<BookDetail> {
    let mut book = load_owned(&state.db, caller, book_id).await?;
    let request = read_changes(fields, cover.as_ref(), state.cover_limit_kb, Mode::Update)?;
    let clear_cover = cover.is_none() && request.clears_cover();

    let processed = match cover {
        Some(upload) => {
            debug!("Processing cover upload {:?}", upload.file_name);
            Some(covers::prepare_cover(upload).await?)
        }
        None => None,
    };

    if let Some(Some(title)) = request.title.clone() {
        book.title = title;
    }
    if let Some(Some(author)) = request.author.clone() {
        book.author = author;
    }
    apply_nullable(request.isbn.clone(), &mut book.isbn);
    apply_nullable(request.description_change(), &mut book.description);
    apply_nullable(request.genre.clone(), &mut book.genre);
    apply_nullable(request.total_pages, &mut book.total_pages);
    apply_nullable(request.rating_change(), &mut book.rating);
    if let Some(Some(page)) = request.current_page {
        book.current_page = page;
    }

    if let Some(Some(status)) = request.status_change() {
        let next = progress::apply_status_change(lifecycle_of(&book), status, today());
        set_lifecycle(&mut book, next);
    }

    let previous_cover = book.cover_image.clone();
    let mut stored_cover = None;
    if let Some(processed) = processed {
        let path = covers::store_cover(state.covers.clone(), processed).await?;
        book.cover_image = Some(path.clone());
        stored_cover = Some(path);
    } else if clear_cover {
        book.cover_image = None;
    }

    let book = match books::update_book(&state.db, &book).await {
        Ok(book) => book,
        Err(e) => {
            if let Some(path) = stored_cover {
                covers::delete_cover(state.covers.clone(), path).await;
            }
            return Err(e);
        }
    };

    if let Some(old) = previous_cover {
        if book.cover_image.as_ref() != Some(&old) {
            covers::delete_cover(state.covers.clone(), old).await;
        }
    }

    debug!("User {} updated book {}", caller.user_id, book.id);
    with_annotations(state, book).await
}

/// Record the current page and derive status from it
pub async fn update_progress(
    state: &AppState,
    caller: Caller,
    book_id: i64,
    fields: &Fields,
) -> Result<ProgressSummary> {
    let mut book = load_owned(&state.db, caller, book_id).await?;

    let (request, mut errors) = read_request::<ProgressRequest>(fields)?;
    errors.require("current_page", &request.current_page);
    errors.into_result()?;
    let current_page = request.current_page.flatten().unwrap_or_default();

    let next = progress::apply_progress(lifecycle_of(&book), current_page, book.total_pages, today());
    if next.status != book.status {
        info!(
            "Book {} moved from {} to {} at page {}",
            book.id, book.status, next.status, current_page
        );
    }
    set_lifecycle(&mut book, next);
    book.current_page = current_page;

    let book = books::update_book(&state.db, &book).await?;

    Ok(ProgressSummary {
        current_page: book.current_page,
        progress_percentage: book.progress_percentage(),
        status: book.status,
    })
}

/// Delete an owned book and its stored cover
pub async fn delete_book(state: &AppState, caller: Caller, book_id: i64) -> Result<()> {
    let book = load_owned(&state.db, caller, book_id).await?;

    if let Some(path) = book.cover_image.clone() {
        covers::delete_cover(state.covers.clone(), path).await;
    }

    if !books::delete_book(&state.db, caller.user_id, book.id).await? {
        return Err(Error::not_found("Book"));
    }

    info!("User {} deleted book {}", caller.user_id, book.id);
    Ok(())
}
