//! Database initialization
//!
//! The database is created on first run. Every table uses
//! `CREATE TABLE IF NOT EXISTS`, so initialization is idempotent and
//! safe to run at every startup. Columns added after v1 are appended to
//! existing tables with `ALTER TABLE` and backfilled.

use crate::db::books::fold_case;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Current schema version
///
/// Increment when the table definitions below change.
///
/// - v1: users, books, bookmarks, quotes
/// - v2: lowercase search columns on books
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Search columns holding lowercased copies of title, author and genre
///
/// SQLite's LIKE only folds ASCII, so case-insensitive search matches
/// against these instead.
const FOLDED_COLUMNS: [&str; 3] = ["title_folded", "author_folded", "genre_folded"];

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // foreign_keys is a per-connection pragma, so it goes on the connect
    // options rather than a one-off query against the pool
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// A single connection that never expires, since every new connection to
/// `:memory:` would see an empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes, then record the schema version
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;
    create_books_table(pool).await?;
    add_folded_columns(pool).await?;
    create_bookmarks_table(pool).await?;
    create_quotes_table(pool).await?;

    record_schema_version(pool).await?;

    Ok(())
}

/// Highest recorded schema version (0 when none)
pub async fn schema_version(pool: &SqlitePool) -> Result<i64> {
    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn record_schema_version(pool: &SqlitePool) -> Result<()> {
    let current = schema_version(pool).await?;

    if current == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    if current > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(CURRENT_SCHEMA_VERSION)
        .execute(pool)
        .await?;

    info!("Database schema at v{}", CURRENT_SCHEMA_VERSION);
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            api_token_hash TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            isbn TEXT,
            description TEXT,
            genre TEXT,
            total_pages INTEGER CHECK (total_pages IS NULL OR total_pages >= 1),
            current_page INTEGER NOT NULL DEFAULT 0 CHECK (current_page >= 0),
            status TEXT NOT NULL DEFAULT 'to_read'
                CHECK (status IN ('to_read', 'reading', 'completed')),
            cover_image TEXT,
            started_at TEXT,
            completed_at TEXT,
            rating REAL CHECK (rating IS NULL OR (rating >= 0 AND rating <= 5)),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            title_folded TEXT NOT NULL DEFAULT '',
            author_folded TEXT NOT NULL DEFAULT '',
            genre_folded TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_user_status ON books(user_id, status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_user_genre ON books(user_id, genre)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

/// Bring a v1 books table up to date
async fn add_folded_columns(pool: &SqlitePool) -> Result<()> {
    let mut added = false;
    for column in FOLDED_COLUMNS {
        if column_exists(pool, "books", column).await? {
            continue;
        }
        let definition = if column == "genre_folded" {
            "TEXT"
        } else {
            "TEXT NOT NULL DEFAULT ''"
        };
        let sql = format!("ALTER TABLE books ADD COLUMN {} {}", column, definition);
        sqlx::query(&sql).execute(pool).await?;
        info!("Added column books.{}", column);
        added = true;
    }

    if added {
        backfill_folded_columns(pool).await?;
    }

    Ok(())
}

async fn backfill_folded_columns(pool: &SqlitePool) -> Result<()> {
    let rows = sqlx::query("SELECT id, title, author, genre FROM books")
        .fetch_all(pool)
        .await?;

    for row in &rows {
        let id: i64 = row.try_get("id")?;
        let title: String = row.try_get("title")?;
        let author: String = row.try_get("author")?;
        let genre: Option<String> = row.try_get("genre")?;

        sqlx::query(
            "UPDATE books SET title_folded = ?, author_folded = ?, genre_folded = ? WHERE id = ?",
        )
        .bind(fold_case(&title))
        .bind(fold_case(&author))
        .bind(genre.as_deref().map(fold_case))
        .bind(id)
        .execute(pool)
        .await?;
    }

    info!("Backfilled search columns for {} books", rows.len());
    Ok(())
}

async fn create_bookmarks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmarks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            page_number INTEGER NOT NULL CHECK (page_number >= 1),
            color TEXT,
            note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookmarks_book ON bookmarks(book_id, page_number)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_quotes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quotes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            page_number INTEGER CHECK (page_number IS NULL OR page_number >= 1),
            context TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_quotes_book ON quotes(book_id, created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
