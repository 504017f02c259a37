//! # MarquePage Common Library
//!
//! Shared code for the MarquePage reading tracker:
//! - Bootstrap configuration loading
//! - Database initialization and repository queries
//! - Plain data records (books, bookmarks, quotes, users)
//! - Typed request bodies and validation with per-field error messages
//! - Reading status / progress rules
//! - Caller identity and API token hashing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod progress;
pub mod requests;
pub mod validation;

pub use auth::Caller;
pub use error::{Error, Result};
pub use models::{Book, BookDetail, Bookmark, Quote, ReadingStatus, User};
pub use validation::FieldErrors;
