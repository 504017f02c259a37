//! API error type and response envelope
//!
//! Every response body has the shape
//! `{success, data?, message?, errors?}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marque_common::FieldErrors;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Message used for every 422 response
pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";

/// JSON envelope shared by success and error responses
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn data_with_message(data: T, message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::data(data)
        }
    }
}

impl Envelope<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
            errors: None,
        }
    }

    fn failure(message: String, errors: Option<FieldErrors>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more fields failed validation (422)
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Missing or unknown bearer token (401)
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Resource absent or owned by someone else (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request body (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Anything unexpected (500); detail is logged, never returned
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<marque_common::Error> for ApiError {
    fn from(err: marque_common::Error) -> Self {
        use marque_common::Error;

        match err {
            Error::Validation(errors) => ApiError::Validation(errors),
            Error::NotFound(message) => ApiError::NotFound(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Envelope::failure(VALIDATION_MESSAGE.to_string(), Some(errors)),
            ),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Envelope::failure("Unauthenticated.".to_string(), None),
            ),
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Envelope::failure(message, None))
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Envelope::failure(message, None))
            }
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Envelope::failure("Server error.".to_string(), None),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
