//! Quote endpoints nested under `/api/books/:book_id/quotes`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use marque_common::models::Quote;
use marque_common::Caller;

use super::{parse_id, RequestBody, BOOK_NOT_FOUND};
use crate::error::{ApiResult, Envelope};
use crate::services::quotes::{self, NOT_FOUND};
use crate::AppState;

fn ids(book_id: &str, id: &str) -> ApiResult<(i64, i64)> {
    Ok((parse_id(book_id, BOOK_NOT_FOUND)?, parse_id(id, NOT_FOUND)?))
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<Quote>>>> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    let items = quotes::list_quotes(&state.db, caller, book_id).await?;
    Ok(Json(Envelope::data(items)))
}

pub async fn create_quote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(book_id): Path<String>,
    body: RequestBody,
) -> ApiResult<(StatusCode, Json<Envelope<Quote>>)> {
    let book_id = parse_id(&book_id, BOOK_NOT_FOUND)?;
    let item = quotes::create_quote(&state.db, caller, book_id, &body.fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data_with_message(item, "Quote created successfully")),
    ))
}

pub async fn show_quote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((book_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<Quote>>> {
    let (book_id, id) = ids(&book_id, &id)?;
    let item = quotes::get_quote(&state.db, caller, book_id, id).await?;
    Ok(Json(Envelope::data(item)))
}

pub async fn update_quote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((book_id, id)): Path<(String, String)>,
    body: RequestBody,
) -> ApiResult<Json<Envelope<Quote>>> {
    let (book_id, id) = ids(&book_id, &id)?;
    let item = quotes::update_quote(&state.db, caller, book_id, id, &body.fields).await?;
    Ok(Json(Envelope::data_with_message(item, "Quote updated successfully")))
}

pub async fn delete_quote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((book_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<()>>> {
    let (book_id, id) = ids(&book_id, &id)?;
    quotes::delete_quote(&state.db, caller, book_id, id).await?;
    Ok(Json(Envelope::message("Quote deleted successfully")))
}
