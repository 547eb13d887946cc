/// Audio clip metadata
use super::{AudioId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one clip in a user's collection
///
/// The bytes live in the blob store under `stream_ref`. Records created by
/// redeeming a share ticket point at the same `stream_ref` as their source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRecord {
    pub id: AudioId,
    pub owner_id: UserId,
    /// Original upload file name
    pub file_name: String,
    /// User-facing name, changed by rename
    pub display_name: String,
    pub duration_seconds: f64,
    /// Blob store key for the audio bytes
    pub stream_ref: String,
    pub uploaded_at: DateTime<Utc>,
    /// Set only on copies created through a share ticket
    pub shared_from_owner_id: Option<UserId>,
}

impl AudioRecord {
    /// Shallow copy of this record into another user's collection.
    ///
    /// The copy gets a fresh id and upload time but keeps the blob reference.
    pub fn shared_copy(&self, new_owner: UserId, shared_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: AudioId::generate(),
            owner_id: new_owner,
            file_name: self.file_name.clone(),
            display_name: self.display_name.clone(),
            duration_seconds: self.duration_seconds,
            stream_ref: self.stream_ref.clone(),
            uploaded_at: now,
            shared_from_owner_id: Some(shared_by),
        }
    }
}

/// Mutable fields of an [`AudioRecord`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioUpdate {
    pub display_name: Option<String>,
}

impl AudioUpdate {
    pub fn rename(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
        }
    }

    pub fn apply(&self, record: &mut AudioRecord) {
        if let Some(name) = &self.display_name {
            record.display_name.clone_from(name);
        }
    }
}
