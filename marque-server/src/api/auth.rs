//! Bearer-token authentication middleware
//!
//! Resolves `Authorization: Bearer <token>` to a user by comparing the
//! SHA-256 of the token with `users.api_token_hash`, then stores the
//! [`Caller`] in the request extensions for the handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use marque_common::auth::{hash_token, parse_bearer};
use marque_common::db::users;
use marque_common::Caller;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Authentication middleware
///
/// Applied with `route_layer` to the `/api` routes only; `/health` and
/// `/storage` are public.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token_hash = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
        .map(hash_token);

    let Some(token_hash) = token_hash else {
        debug!("Request to {} without bearer token", request.uri().path());
        return Err(ApiError::Unauthenticated);
    };

    let Some(user) = users::find_by_token_hash(&state.db, &token_hash).await? else {
        warn!("Rejected unknown API token for {}", request.uri().path());
        return Err(ApiError::Unauthenticated);
    };

    request.extensions_mut().insert(Caller::new(user.id));
    Ok(next.run(request).await)
}
