//! Typed request bodies for book, progress and annotation writes
//!
//! Every field is `Option<Option<T>>` (absent / null / value) so the same
//! struct serves create and update. Which fields are required differs
//! between the two and is checked by the services.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::models::ReadingStatus;
use crate::validation::{de, one_of};

fn reading_status(value: &str) -> Result<(), ValidationError> {
    one_of(value, &ReadingStatus::ALL)
}

/// `#RRGGBB`
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn hex_color(value: &str) -> Result<(), ValidationError> {
    if is_hex_color(value) {
        Ok(())
    } else {
        Err(ValidationError::new("format"))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct BookRequest {
    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 255))]
    pub title: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 255))]
    pub author: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 17))]
    pub isbn: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    pub description: Option<Option<String>>,

    /// Older clients send the description as `summary`
    #[serde(default, deserialize_with = "de::text")]
    pub summary: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 100))]
    pub genre: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::integer")]
    #[validate(range(min = 1))]
    pub total_pages: Option<Option<i64>>,

    #[serde(default, deserialize_with = "de::integer")]
    #[validate(range(min = 0))]
    pub current_page: Option<Option<i64>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(custom(function = "reading_status"))]
    pub status: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::number")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<Option<f64>>,

    #[serde(default, deserialize_with = "de::date")]
    pub started_at: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "de::date")]
    pub completed_at: Option<Option<NaiveDate>>,

    /// Only an explicit null matters here (clear the cover); files arrive
    /// separately as multipart parts
    #[serde(default, deserialize_with = "serde_with::rust::double_option::deserialize")]
    pub cover_image: Option<Option<Value>>,
}

impl BookRequest {
    /// `description`, falling back to `summary` when it is absent
    pub fn description_change(&self) -> Option<Option<String>> {
        self.description.clone().or_else(|| self.summary.clone())
    }

    /// Requested status; only meaningful after validation
    pub fn status_change(&self) -> Option<Option<ReadingStatus>> {
        self.status
            .as_ref()
            .map(|s| s.as_deref().and_then(|v| v.parse().ok()))
    }

    /// Rating rounded to one decimal place
    pub fn rating_change(&self) -> Option<Option<f64>> {
        self.rating
            .map(|r| r.map(|value| (value * 10.0).round() / 10.0))
    }

    pub fn clears_cover(&self) -> bool {
        matches!(self.cover_image, Some(None))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProgressRequest {
    #[serde(default, deserialize_with = "de::integer")]
    #[validate(range(min = 0))]
    pub current_page: Option<Option<i64>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct BookmarkRequest {
    #[serde(default, deserialize_with = "de::integer")]
    #[validate(range(min = 1))]
    pub page_number: Option<Option<i64>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 7), custom(function = "hex_color"))]
    pub color: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 1000))]
    pub note: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct QuoteRequest {
    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 2000))]
    pub content: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::integer")]
    #[validate(range(min = 1))]
    pub page_number: Option<Option<i64>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(length(max = 1000))]
    pub context: Option<Option<String>>,
}
