//! Domain operations behind the HTTP handlers
//!
//! Every operation takes the authenticated [`marque_common::Caller`]
//! explicitly and scopes all reads and writes to it.

pub mod book_query;
pub mod bookmarks;
pub mod books;
pub mod quotes;

use chrono::{NaiveDate, Utc};

/// Current date used for lifecycle dates
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
