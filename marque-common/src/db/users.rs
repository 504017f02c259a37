//! User accounts

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::User;
use crate::Result;

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a user with an already-hashed API token
pub async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    token_hash: &str,
) -> Result<User> {
    let now = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO users (name, email, api_token_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(token_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        created_at: now,
    })
}

/// User whose token hashes to `token_hash`, if any
pub async fn find_by_token_hash(pool: &SqlitePool, token_hash: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, name, email, created_at FROM users WHERE api_token_hash = ?")
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, name, email, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Replace a user's token hash; returns false when the email is unknown
pub async fn rotate_token(pool: &SqlitePool, email: &str, token_hash: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET api_token_hash = ?, updated_at = ? WHERE email = ?")
        .bind(token_hash)
        .bind(Utc::now())
        .bind(email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
