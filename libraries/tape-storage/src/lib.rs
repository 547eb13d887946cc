//! Tape Storage
//!
//! Implementations of the `tape-core` collaborator traits.
//!
//! # Backends
//!
//! - [`SqliteStore`]: persistent `SQLite` database, one vertical slice of
//!   queries per entity (`users`, `audio`, `tickets`)
//! - [`MemoryStore`]: process-local maps, used by tests and ephemeral servers
//!
//! # Example
//!
//! ```rust,no_run
//! use tape_core::CredentialStore;
//! use tape_storage::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::connect("sqlite://tape.db").await?;
//! let user = store.find_user_by_email("alice@example.com").await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod memory;

// Vertical slices
pub mod audio;
pub mod tickets;
pub mod users;

pub use context::SqliteStore;
pub use error::StorageError;
pub use memory::MemoryStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Called once at startup so the schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://tape.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!("SQLite pool created");

    Ok(pool)
}

/// Timestamps are stored as unix milliseconds.
pub(crate) fn timestamp_from_millis(
    column: &'static str,
    millis: i64,
) -> Result<chrono::DateTime<chrono::Utc>, StorageError> {
    chrono::DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::corrupt(column, format!("timestamp {} out of range", millis)))
}
