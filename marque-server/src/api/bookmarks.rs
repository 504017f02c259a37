//! Bookmark endpoints nested under `/api/books/:book_id/bookmarks`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use marque_common::models::Bookmark;
use marque_common::Caller;

use super::{parse_id, RequestBody, BOOK_NOT_FOUND};
use crate::error::{ApiResult, Envelope};
use crate::services::bookmarks::{self, NOT_FOUND};
use crate::AppState;

fn ids(book_id: &str, id: &str) -> ApiResult<(i64, i64)> {
    Ok((parse_id(book_id, BOOK_NOT_FOUND)?, parse_id(id, NOT_FOUND)?))
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<Bookmark>>>> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    let items = bookmarks::list_bookmarks(&state.db, caller, book_id).await?;
    Ok(Json(Envelope::data(items)))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
    body: RequestBody,
) -> ApiResult<(StatusCode, Json<Envelope<Bookmark>>)> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    let item = bookmarks::create_bookmark(&state.db, caller, book_id, &body.fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data_with_message(item, "Bookmark created successfully")),
    ))
}

pub async fn show_bookmark(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((book_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<Bookmark>>> {
    let (book_id, id) = ids(&book_id, &id)?;
    let item = bookmarks::get_bookmark(&state.db, caller, book_id, id).await?;
    Ok(Json(Envelope::data(item)))
}

pub async fn update_bookmark(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((book_id, id)): Path<(String, String)>,
    body: RequestBody,
) -> ApiResult<Json<Envelope<Bookmark>>> {
    let (book_id, id) = ids(&book_id, &id)?;
    let item = bookmarks::update_bookmark(&state.db, caller, book_id, id, &body.fields).await?;
    Ok(Json(Envelope::data_with_message(item, "Bookmark updated successfully")))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((book_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<()>>> {
    let (book_id, id) = ids(&book_id, &id)?;
    bookmarks::delete_bookmark(&state.db, caller, book_id, id).await?;
    Ok(Json(Envelope::message("Bookmark deleted successfully")))
}
