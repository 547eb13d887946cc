//! User and session token queries

use crate::error::Result;
use sqlx::SqlitePool;
use tape_core::types::{User, UserId};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    password_hash: String,
    current_token: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            current_token: row.current_token,
        }
    }
}

/// Look up a user by login email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, password_hash, current_token FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

/// Look up a user by id
pub async fn find_by_id(pool: &SqlitePool, id: &UserId) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, password_hash, current_token FROM users WHERE id = ?",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

/// Insert a new user
///
/// The `UNIQUE` constraint on `email` rejects a second account for the same
/// address even when two registrations race.
pub async fn insert(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, current_token)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user.id.as_str())
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.current_token.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the user's current session token with a single `UPDATE`
pub async fn set_current_token(pool: &SqlitePool, id: &UserId, token: Option<&str>) -> Result<()> {
    sqlx::query("UPDATE users SET current_token = ? WHERE id = ?")
        .bind(token)
        .bind(id.as_str())
        .execute(pool)
        .await?;

    Ok(())
}
