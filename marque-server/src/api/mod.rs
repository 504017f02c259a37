//! HTTP API handlers
//!
//! Everything under `/api` sits behind [`auth_middleware`]; handlers pull
//! the resolved [`marque_common::Caller`] from the request extensions and
//! hand it to the service layer.

pub mod auth;
pub mod body;
pub mod bookmarks;
pub mod books;
pub mod health;
pub mod quotes;
pub mod user;

use axum::routing::{get, put};
use axum::Router;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub use auth::auth_middleware;
pub use body::RequestBody;
pub use health::health_routes;

/// Routes nested under `/api` (authentication is layered on by the caller)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(user::current_user))
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:book_id",
            get(books::show_book)
                .put(books::update_book)
                .patch(books::update_book)
                .post(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:book_id/progress", put(books::update_progress))
        .route(
            "/books/:book_id/bookmarks",
            get(bookmarks::list_bookmarks).post(bookmarks::create_bookmark),
        )
        .route(
            "/books/:book_id/bookmarks/:id",
            get(bookmarks::show_bookmark)
                .put(bookmarks::update_bookmark)
                .patch(bookmarks::update_bookmark)
                .delete(bookmarks::delete_bookmark),
        )
        .route(
            "/books/:book_id/quotes",
            get(quotes::list_quotes).post(quotes::create_quote),
        )
        .route(
            "/books/:book_id/quotes/:id",
            get(quotes::show_quote)
                .put(quotes::update_quote)
                .patch(quotes::update_quote)
                .delete(quotes::delete_quote),
        )
}

/// Numeric path id; anything else cannot name a record, so it is a 404
pub(crate) fn parse_id(raw: &str, not_found: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::NotFound(not_found.to_string()))
}

pub(crate) const BOOK_NOT_FOUND: &str = "Book not found";
