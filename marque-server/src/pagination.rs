//! Pagination for list endpoints
//!
//! Pages are 1-indexed. Requests past the last page are not clamped;
//! they simply return an empty page.

use serde::Serialize;

/// Page size when the caller does not ask for one
pub const DEFAULT_PER_PAGE: i64 = 15;

/// Pagination metadata calculated from total results and requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Requested page number (1-indexed)
    pub page: i64,
    pub per_page: i64,
    /// Total number of pages, at least 1
    pub last_page: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Calculate pagination metadata
///
/// `page` and `per_page` must already be validated as positive.
///
/// # Examples
/// ```
/// use marque_server::pagination::calculate_pagination;
///
/// // 40 results at 15 per page = 3 pages (15 + 15 + 10)
/// let p = calculate_pagination(40, 2, 15);
/// assert_eq!(p.last_page, 3);
/// assert_eq!(p.offset, 15);
///
/// // An empty result set still reports one page
/// assert_eq!(calculate_pagination(0, 1, 15).last_page, 1);
/// ```
pub fn calculate_pagination(total_results: i64, page: i64, per_page: i64) -> Pagination {
    let last_page = (total_results.saturating_add(per_page - 1) / per_page).max(1);
    let offset = (page - 1).saturating_mul(per_page);

    Pagination {
        page,
        per_page,
        last_page,
        offset,
    }
}

/// One page of results in the list response shape
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub current_page: i64,
    pub last_page: i64,
    pub per_page: i64,
    /// 1-based position of the first item on this page
    pub from: Option<i64>,
    /// 1-based position of the last item on this page
    pub to: Option<i64>,
}

impl<T: Serialize> Page<T> {
    pub fn new(data: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = pagination.offset + 1;
            (Some(from), Some(from + data.len() as i64 - 1))
        };

        Self {
            data,
            total,
            current_page: pagination.page,
            last_page: pagination.last_page,
            per_page: pagination.per_page,
            from,
            to,
        }
    }
}
