//! marque-server library - MarquePage reading tracker HTTP service
//!
//! Books, reading progress, bookmarks and quotes for authenticated users,
//! served as a JSON API under `/api`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod covers;
pub mod error;
pub mod pagination;
pub mod services;

use covers::CoverStore;

/// Allowance for non-file form fields on top of the cover upload limit
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Storage for processed cover images
    pub covers: Arc<dyn CoverStore>,
    /// Largest accepted cover upload in kilobytes
    pub cover_limit_kb: u64,
}

impl AppState {
    pub fn new(db: SqlitePool, covers: Arc<dyn CoverStore>, cover_limit_kb: u64) -> Self {
        Self {
            db,
            covers,
            cover_limit_kb,
        }
    }
}

/// Build application router
///
/// `/health` and `/storage/*` are public; everything under `/api`
/// requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let body_limit = (state.cover_limit_kb as usize)
        .saturating_mul(1024)
        .saturating_add(FORM_OVERHEAD_BYTES);

    let protected = api::api_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        api::auth_middleware,
    ));

    let storage = ServeDir::new(state.covers.root());

    Router::new()
        .nest("/api", protected)
        .merge(api::health_routes())
        .nest_service("/storage", storage)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
