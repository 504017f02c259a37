//! Reading status lifecycle
//!
//! States: `to_read` -> `reading` -> `completed`.
//!
//! `started_at` and `completed_at` are write-once: a rule may fill them in
//! when they are empty, but nothing here ever replaces or clears a date
//! that is already set. Explicit status changes in any direction are
//! allowed and leave existing dates alone.

use chrono::NaiveDate;

use crate::models::ReadingStatus;

/// Status plus the two lifecycle dates of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    pub status: ReadingStatus,
    pub started_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
}

/// Percentage of the book read, rounded and clamped to 0..=100
///
/// Unknown or zero page counts give 0.
pub fn progress_percentage(current_page: i64, total_pages: Option<i64>) -> u8 {
    match total_pages {
        Some(total) if total > 0 => {
            let pct = (current_page as f64 / total as f64 * 100.0).round();
            pct.clamp(0.0, 100.0) as u8
        }
        _ => 0,
    }
}

/// Lifecycle of a newly created book
///
/// `reading` without a start date starts today. `completed` without a
/// completion date completes today, and a completed book always has a
/// start date (the completion date when none was given).
pub fn initial_lifecycle(
    status: Option<ReadingStatus>,
    started_at: Option<NaiveDate>,
    completed_at: Option<NaiveDate>,
    today: NaiveDate,
) -> Lifecycle {
    let status = status.unwrap_or_default();
    let mut lifecycle = Lifecycle {
        status,
        started_at,
        completed_at,
    };

    match status {
        ReadingStatus::ToRead => {}
        ReadingStatus::Reading => {
            lifecycle.started_at.get_or_insert(today);
        }
        ReadingStatus::Completed => {
            let completed = *lifecycle.completed_at.get_or_insert(today);
            lifecycle.started_at.get_or_insert(completed);
        }
    }

    lifecycle
}

/// Explicit status change requested through an update
pub fn apply_status_change(
    current: Lifecycle,
    requested: ReadingStatus,
    today: NaiveDate,
) -> Lifecycle {
    let mut next = Lifecycle {
        status: requested,
        ..current
    };

    match requested {
        ReadingStatus::Reading
            if current.status != ReadingStatus::Reading && current.started_at.is_none() =>
        {
            next.started_at = Some(today);
        }
        ReadingStatus::Completed
            if current.status != ReadingStatus::Completed && current.completed_at.is_none() =>
        {
            next.completed_at = Some(today);
        }
        _ => {}
    }

    next
}

/// Status derived from a page-progress update
///
/// Rules, applied in order:
/// 1. `to_read` with a positive page becomes `reading`
/// 2. reaching `total_pages` (when known) becomes `completed`
pub fn apply_progress(
    current: Lifecycle,
    current_page: i64,
    total_pages: Option<i64>,
    today: NaiveDate,
) -> Lifecycle {
    let mut next = current;

    if current.status == ReadingStatus::ToRead && current_page > 0 {
        next.status = ReadingStatus::Reading;
        next.started_at = current.started_at.or(Some(today));
    }

    if let Some(total) = total_pages {
        if current_page >= total && current.status != ReadingStatus::Completed {
            next.status = ReadingStatus::Completed;
            next.completed_at = current.completed_at.or(Some(today));
        }
    }

    next
}
