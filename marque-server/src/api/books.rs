//! Book endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use marque_common::models::{BookDetail, ProgressSummary};
use marque_common::Caller;

use super::{parse_id, RequestBody, BOOK_NOT_FOUND};
use crate::error::{ApiResult, Envelope};
use crate::pagination::Page;
use crate::services::book_query::{self, ListOptions};
use crate::services::books;
use crate::AppState;

/// GET /api/books
pub async fn list_books(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Envelope<Page<BookDetail>>>> {
    let options = ListOptions::from_params(&params)?;
    let page = book_query::list_books(&state.db, caller, &options).await?;
    Ok(Json(Envelope::data(page)))
}

/// POST /api/books
pub async fn create_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: RequestBody,
) -> ApiResult<(StatusCode, Json<Envelope<BookDetail>>)> {
    let book = books::create_book(&state, caller, &body.fields, body.cover).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data_with_message(book, "Book created successfully")),
    ))
}

/// GET /api/books/:book_id
pub async fn show_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Envelope<BookDetail>>> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    let book = books::get_book(&state, caller, book_id).await?;
    Ok(Json(Envelope::data(book)))
}

/// PUT | PATCH | POST /api/books/:book_id
pub async fn update_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
    body: RequestBody,
) -> ApiResult<Json<Envelope<BookDetail>>> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    let book = books::update_book(&state, caller, book_id, &body.fields, body.cover).await?;
    Ok(Json(Envelope::data_with_message(book, "Book updated successfully")))
}

/// DELETE /api/books/:book_id
pub async fn delete_book(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    books::delete_book(&state, caller, book_id).await?;
    Ok(Json(Envelope::message("Book deleted successfully")))
}

/// PUT /api/books/:book_id/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
    body: RequestBody,
) -> ApiResult<Json<Envelope<ProgressSummary>>> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    let summary = books::update_progress(&state, caller, book_id, &body.fields).await?;
    Ok(Json(Envelope::data_with_message(
        summary,
        "Reading progress updated successfully",
    )))
}
