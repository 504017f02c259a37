//! GET /api/user

use axum::{extract::State, Extension, Json};
use marque_common::db::users;
use marque_common::{Caller, User};

use crate::error::{ApiError, ApiResult, Envelope};
use crate::AppState;

/// The authenticated caller's account
pub async fn current_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Envelope<User>>> {
    let user = users::find_by_id(&state.db, caller.user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(Envelope::data(user)))
}
