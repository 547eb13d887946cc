/// Storage-specific errors
use tape_core::CoreError;
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back to a domain type
    #[error("Corrupt column {column}: {detail}")]
    Corrupt { column: &'static str, detail: String },

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub(crate) fn corrupt(column: &'static str, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            column,
            detail: detail.into(),
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                CoreError::Duplicate(db.message().to_string())
            }
            StorageError::Corrupt { .. } => CoreError::Corrupt(err.to_string()),
            other => CoreError::Backend(other.to_string()),
        }
    }
}
