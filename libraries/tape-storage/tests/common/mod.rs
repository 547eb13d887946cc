//! Test helpers for storage integration tests
//!
//! These use REAL SQLite files (not in-memory) so migrations, constraints and
//! indexes behave as in production.

use chrono::{DateTime, Utc};
use tape_core::types::{AudioId, AudioRecord, User, UserId};
use tape_storage::SqliteStore;
use tempfile::TempDir;

/// Test database wrapper that cleans up on drop
pub struct TestDb {
    pub store: SqliteStore,
    _temp_dir: TempDir,
}

impl TestDb {
    /// Create a new test database with migrations applied
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let store = SqliteStore::connect(&db_url)
            .await
            .expect("Failed to open store");

        Self {
            store,
            _temp_dir: temp_dir,
        }
    }
}

pub fn test_user(email: &str) -> User {
    User {
        id: UserId::generate(),
        email: email.to_string(),
        name: "Test User".to_string(),
        password_hash: "$2b$04$not-a-real-hash".to_string(),
        current_token: None,
    }
}

pub fn test_record(owner: &UserId, stream_ref: &str, uploaded_at: DateTime<Utc>) -> AudioRecord {
    AudioRecord {
        id: AudioId::generate(),
        owner_id: owner.clone(),
        file_name: "demo.mp3".to_string(),
        display_name: "Demo".to_string(),
        duration_seconds: 42.5,
        stream_ref: stream_ref.to_string(),
        uploaded_at,
        shared_from_owner_id: None,
    }
}
