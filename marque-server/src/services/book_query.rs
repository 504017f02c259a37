//! Query/Filter Builder for the book list
//!
//! Turns list request parameters into one owner-scoped SQL statement
//! (plus a matching COUNT), then attaches bookmarks and quotes to the
//! returned page with one query each.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use marque_common::db::books::{book_from_row, fold_case, BOOK_COLUMNS};
use marque_common::db::{bookmarks, quotes};
use marque_common::models::{BookDetail, ReadingStatus};
use marque_common::validation::{de, one_of, read_request, Fields};
use marque_common::{Caller, Result};
use serde::Deserialize;
use serde_json::Value;
use sqlx::sqlite::SqliteArguments;
use sqlx::query::Query;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::pagination::{calculate_pagination, Page, DEFAULT_PER_PAGE};

/// Sortable columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Author,
    Rating,
    CurrentPage,
}

impl SortColumn {
    pub const ALL: [&'static str; 6] = [
        "created_at",
        "updated_at",
        "title",
        "author",
        "rating",
        "current_page",
    ];

    /// ORDER BY expression for this column
    fn sql(&self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::Title => "title COLLATE NOCASE",
            SortColumn::Author => "author COLLATE NOCASE",
            SortColumn::Rating => "rating",
            SortColumn::CurrentPage => "current_page",
        }
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortColumn::CreatedAt),
            "updated_at" => Ok(SortColumn::UpdatedAt),
            "title" => Ok(SortColumn::Title),
            "author" => Ok(SortColumn::Author),
            "rating" => Ok(SortColumn::Rating),
            "current_page" => Ok(SortColumn::CurrentPage),
            other => Err(format!("Unknown sort column: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const ALL: [&'static str; 2] = ["asc", "desc"];
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        })
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

/// Validated list parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub search: Option<String>,
    pub status: Option<ReadingStatus>,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub sort: SortColumn,
    pub order: SortOrder,
    pub page: i64,
    pub per_page: i64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            genre: None,
            author: None,
            sort: SortColumn::default(),
            order: SortOrder::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

fn reading_status(value: &str) -> std::result::Result<(), ValidationError> {
    one_of(value, &ReadingStatus::ALL)
}

fn sort_column(value: &str) -> std::result::Result<(), ValidationError> {
    one_of(value, &SortColumn::ALL)
}

fn sort_order(value: &str) -> std::result::Result<(), ValidationError> {
    one_of(value, &SortOrder::ALL)
}

/// Raw list parameters as they arrive on the query string
#[derive(Debug, Default, Deserialize, Validate)]
struct ListQuery {
    #[serde(default, deserialize_with = "de::text")]
    search: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(custom(function = "reading_status"))]
    status: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    genre: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    author: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(custom(function = "sort_column"))]
    sort: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::text")]
    #[validate(custom(function = "sort_order"))]
    order: Option<Option<String>>,

    #[serde(default, deserialize_with = "de::integer")]
    #[validate(range(min = 1))]
    page: Option<Option<i64>>,

    /// Capped so the annotation lookups stay well inside SQLite's bind limit
    #[serde(default, deserialize_with = "de::integer")]
    #[validate(range(min = 1, max = 100))]
    per_page: Option<Option<i64>>,
}

fn parsed<T: FromStr>(value: Option<Option<String>>) -> Option<T> {
    value.flatten().and_then(|v| v.parse().ok())
}

impl ListOptions {
    /// Parse query-string parameters; blank values count as absent
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let fields: Fields = params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let (query, errors) = read_request::<ListQuery>(&fields)?;
        errors.into_result()?;

        Ok(Self {
            search: query.search.flatten(),
            status: parsed(query.status),
            genre: query.genre.flatten(),
            author: query.author.flatten(),
            sort: parsed(query.sort).unwrap_or_default(),
            order: parsed(query.order).unwrap_or_default(),
            page: query.page.flatten().unwrap_or(1),
            per_page: query.per_page.flatten().unwrap_or(DEFAULT_PER_PAGE),
        })
    }
}

/// Positional bind value
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Int(i64),
    Text(String),
}

/// SQL for one list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListSql {
    pub count_sql: String,
    /// Select with `LIMIT ? OFFSET ?` left to bind after `binds`
    pub select_sql: String,
    pub binds: Vec<Bind>,
}

/// Escape LIKE wildcards so user text matches literally
pub fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Build the filtered, ordered query for `caller`
pub fn build_list_sql(caller: Caller, options: &ListOptions) -> ListSql {
    let mut conditions = vec!["user_id = ?".to_string()];
    let mut binds = vec![Bind::Int(caller.user_id)];

    if let Some(search) = &options.search {
        conditions.push(
            "(title_folded LIKE ? ESCAPE '\\' OR author_folded LIKE ? ESCAPE '\\' \
             OR genre_folded LIKE ? ESCAPE '\\')"
                .to_string(),
        );
        let pattern = like_pattern(&fold_case(search));
        binds.extend(std::iter::repeat(Bind::Text(pattern)).take(3));
    }

    if let Some(status) = options.status {
        conditions.push("status = ?".to_string());
        binds.push(Bind::Text(status.as_str().to_string()));
    }

    if let Some(genre) = &options.genre {
        conditions.push("genre = ?".to_string());
        binds.push(Bind::Text(genre.clone()));
    }

    if let Some(author) = &options.author {
        conditions.push("author_folded LIKE ? ESCAPE '\\'".to_string());
        binds.push(Bind::Text(like_pattern(&fold_case(author))));
    }

    let where_clause = conditions.join(" AND ");

    ListSql {
        count_sql: format!("SELECT COUNT(*) FROM books WHERE {}", where_clause),
        select_sql: format!(
            "SELECT {} FROM books WHERE {} ORDER BY {} {}, id {} LIMIT ? OFFSET ?",
            BOOK_COLUMNS,
            where_clause,
            options.sort.sql(),
            options.order,
            options.order
        ),
        binds,
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: &'q [Bind],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            Bind::Int(v) => query.bind(*v),
            Bind::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

/// One page of the caller's books with annotations attached
pub async fn list_books(
    pool: &SqlitePool,
    caller: Caller,
    options: &ListOptions,
) -> Result<Page<BookDetail>> {
    let sql = build_list_sql(caller, options);
    debug!("Book list query: {} ({} binds)", sql.select_sql, sql.binds.len());

    let total: i64 = bind_all(sqlx::query(&sql.count_sql), &sql.binds)
        .fetch_one(pool)
        .await?
        .try_get(0)?;

    let pagination = calculate_pagination(total, options.page, options.per_page);

    let rows = bind_all(sqlx::query(&sql.select_sql), &sql.binds)
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await?;

    let books = rows
        .iter()
        .map(book_from_row)
        .collect::<Result<Vec<_>>>()?;

    let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
    let mut marks = bookmarks::list_for_books(pool, &ids).await?;
    let mut quotes = quotes::list_for_books(pool, &ids).await?;

    let data = books
        .into_iter()
        .map(|book| {
            let book_marks = marks.remove(&book.id).unwrap_or_default();
            let book_quotes = quotes.remove(&book.id).unwrap_or_default();
            BookDetail::new(book, book_marks, book_quotes)
        })
        .collect();

    Ok(Page::new(data, total, pagination))
}
