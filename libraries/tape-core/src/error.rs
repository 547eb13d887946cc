/// Core error types for Tape
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failures reported by collaborator stores
///
/// "Not found" is never an error at this level: lookups return `Option`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A uniqueness constraint rejected the write
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// The backing store failed or is unreachable
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Stored data could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl CoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }
}
