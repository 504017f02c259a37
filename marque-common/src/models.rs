//! Plain data records
//!
//! Rows are mapped by hand in the `db` repository functions; nothing here
//! talks to the database.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::progress_percentage;

/// Reading state of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    ToRead,
    Reading,
    Completed,
}

impl ReadingStatus {
    /// Accepted spellings, in lifecycle order
    pub const ALL: [&'static str; 3] = ["to_read", "reading", "completed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::ToRead => "to_read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Completed => "completed",
        }
    }
}

impl Default for ReadingStatus {
    fn default() -> Self {
        ReadingStatus::ToRead
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_read" => Ok(ReadingStatus::ToRead),
            "reading" => Ok(ReadingStatus::Reading),
            "completed" => Ok(ReadingStatus::Completed),
            other => Err(format!("Unknown reading status: {}", other)),
        }
    }
}

/// Account that owns books; authenticated by bearer token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub total_pages: Option<i64>,
    pub current_page: i64,
    pub status: ReadingStatus,
    /// Path relative to the cover store root
    pub cover_image: Option<String>,
    pub started_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn progress_percentage(&self) -> u8 {
        progress_percentage(self.current_page, self.total_pages)
    }
}

/// Validated fields for inserting a book
///
/// Status and dates are already resolved by the lifecycle rules.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub total_pages: Option<i64>,
    pub current_page: i64,
    pub status: ReadingStatus,
    pub cover_image: Option<String>,
    pub started_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub book_id: i64,
    pub page_number: i64,
    pub color: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBookmark {
    pub page_number: i64,
    pub color: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub id: i64,
    pub book_id: i64,
    pub content: String,
    pub page_number: Option<i64>,
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuote {
    pub content: String,
    pub page_number: Option<i64>,
    pub context: Option<String>,
}

/// Book as returned by the API: record, derived progress, annotations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub progress_percentage: u8,
    pub bookmarks: Vec<Bookmark>,
    pub quotes: Vec<Quote>,
}

impl BookDetail {
    pub fn new(book: Book, bookmarks: Vec<Bookmark>, quotes: Vec<Quote>) -> Self {
        let progress_percentage = book.progress_percentage();
        Self {
            book,
            progress_percentage,
            bookmarks,
            quotes,
        }
    }
}

/// Result of a progress update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub current_page: i64,
    pub progress_percentage: u8,
    pub status: ReadingStatus,
}
