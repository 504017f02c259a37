//! Caller identity and API token handling
//!
//! Clients authenticate with `Authorization: Bearer <token>`. Only the
//! SHA-256 hash of a token is stored (`users.api_token_hash`), so a leaked
//! database does not leak usable tokens.
//!
//! This module holds pure functions only; the axum middleware that resolves
//! a [`Caller`] lives in the server crate.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated API tokens
pub const TOKEN_LENGTH: usize = 40;

/// Authenticated caller, passed explicitly to every service operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

impl Caller {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Generate a fresh random API token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 of the token as 64 lowercase hex characters
///
/// # Examples
///
/// ```
/// use marque_common::auth::hash_token;
///
/// let hash = hash_token("secret-token");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_token("secret-token"));
/// ```
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization` header value
///
/// The scheme is matched case-insensitively; empty tokens are rejected.
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
