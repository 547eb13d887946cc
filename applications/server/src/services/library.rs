/// A user's own audio collection
use crate::error::{Result, ServerError};
use crate::jobs::BlobReaper;
use crate::services::blob_refs::BlobRefLocks;
use crate::services::blob_store::BlobStore;
use bytes::Bytes;
use std::sync::Arc;
use tape_core::{AudioCatalog, AudioId, AudioRecord, AudioUpdate, Clock, UserId};
use uuid::Uuid;

/// A validated upload, ready to store
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub file_name: String,
    pub content_type: String,
    pub display_name: String,
    pub duration_seconds: f64,
    pub data: Bytes,
}

#[derive(Clone)]
pub struct AudioLibrary {
    catalog: Arc<dyn AudioCatalog>,
    blobs: Arc<dyn BlobStore>,
    reaper: BlobReaper,
    ref_locks: BlobRefLocks,
    clock: Arc<dyn Clock>,
}

impl AudioLibrary {
    pub fn new(
        catalog: Arc<dyn AudioCatalog>,
        blobs: Arc<dyn BlobStore>,
        reaper: BlobReaper,
        ref_locks: BlobRefLocks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            blobs,
            reaper,
            ref_locks,
            clock,
        }
    }

    /// Store the bytes, then the metadata
    ///
    /// Nothing is recorded if the blob write fails. If the metadata insert
    /// fails the new blob is queued for deletion.
    pub async fn upload(&self, owner: &UserId, upload: NewUpload) -> Result<AudioRecord> {
        if !upload.content_type.starts_with("audio") {
            return Err(ServerError::Validation(format!(
                "Unsupported content type: {}",
                upload.content_type
            )));
        }
        if !upload.duration_seconds.is_finite() || upload.duration_seconds < 0.0 {
            return Err(ServerError::Validation("Invalid duration".to_string()));
        }

        let stream_ref = format!("{}.mp3", Uuid::new_v4().simple());
        let size = upload.data.len();
        self.blobs
            .put(&stream_ref, &upload.content_type, upload.data)
            .await?;

        let record = AudioRecord {
            id: AudioId::generate(),
            owner_id: owner.clone(),
            file_name: upload.file_name,
            display_name: upload.display_name,
            duration_seconds: upload.duration_seconds,
            stream_ref,
            uploaded_at: self.clock.now(),
            shared_from_owner_id: None,
        };

        if let Err(e) = self.catalog.insert(record.clone()).await {
            self.reaper.enqueue(record.stream_ref.clone());
            return Err(e.into());
        }

        tracing::info!(
            audio_id = %record.id,
            user_id = %owner,
            size,
            "Audio uploaded"
        );
        Ok(record)
    }

    /// Newest first
    pub async fn list(&self, owner: &UserId) -> Result<Vec<AudioRecord>> {
        Ok(self.catalog.list_by_owner(owner).await?)
    }

    /// Someone else's clip is reported as not found
    pub async fn get(&self, owner: &UserId, audio_id: &AudioId) -> Result<AudioRecord> {
        self.owned(owner, audio_id).await
    }

    pub async fn rename(&self, owner: &UserId, audio_id: &AudioId, display_name: &str) -> Result<AudioRecord> {
        let mut record = self.owned(owner, audio_id).await?;

        let update = AudioUpdate::rename(display_name);
        self.catalog.update(audio_id, update.clone()).await?;
        update.apply(&mut record);

        tracing::info!(audio_id = %audio_id, "Audio renamed");
        Ok(record)
    }

    /// Remove the record now and its blob later
    ///
    /// The blob is kept while shared copies still point at it. The reference
    /// check runs under the blob's lock so a concurrent redemption either
    /// lands first (and is seen) or finds the source gone.
    pub async fn delete(&self, owner: &UserId, audio_id: &AudioId) -> Result<()> {
        let record = self.owned(owner, audio_id).await?;
        let _guard = self.ref_locks.lock(&record.stream_ref).await;
        self.catalog.delete(audio_id).await?;

        let still_referenced = self
            .catalog
            .list_by_stream_ref(&record.stream_ref)
            .await?
            .iter()
            .any(|other| other.id != record.id);

        if still_referenced {
            tracing::info!(
                audio_id = %audio_id,
                stream_ref = %record.stream_ref,
                "Audio deleted; blob kept for shared copies"
            );
        } else {
            self.reaper.enqueue(record.stream_ref);
            tracing::info!(audio_id = %audio_id, "Audio deleted");
        }
        Ok(())
    }

    async fn owned(&self, owner: &UserId, audio_id: &AudioId) -> Result<AudioRecord> {
        self.catalog
            .get_by_id(audio_id)
            .await?
            .filter(|record| &record.owner_id == owner)
            .ok_or(ServerError::AudioNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::blob_store::MemoryBlobStore;
    use chrono::{Duration, Utc};
    use tape_core::ManualClock;
    use tape_storage::MemoryStore;

    struct Fixture {
        library: AudioLibrary,
        store: Arc<MemoryStore>,
        blobs: Arc<MemoryBlobStore>,
        clock: Arc<ManualClock>,
        reaper_task: tokio::task::JoinHandle<()>,
    }

    impl Fixture {
        /// Drop the library and wait until queued deletions have run
        async fn drain(self) -> (Arc<MemoryStore>, Arc<MemoryBlobStore>) {
            drop(self.library);
            self.reaper_task.await.unwrap();
            (self.store, self.blobs)
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (reaper, reaper_task) = BlobReaper::spawn(blobs.clone());
        let library = AudioLibrary::new(
            store.clone(),
            blobs.clone(),
            reaper,
            BlobRefLocks::new(),
            clock.clone(),
        );
        Fixture {
            library,
            store,
            blobs,
            clock,
            reaper_task,
        }
    }

    fn upload(name: &str) -> NewUpload {
        NewUpload {
            file_name: format!("{name}.mp3"),
            content_type: "audio/mpeg".to_string(),
            display_name: name.to_string(),
            duration_seconds: 12.0,
            data: Bytes::from_static(b"ID3 fake mp3 bytes"),
        }
    }

    #[tokio::test]
    async fn upload_stores_blob_and_record() {
        let f = fixture();
        let owner = UserId::new("alice");

        let record = f.library.upload(&owner, upload("take")).await.unwrap();
        assert_eq!(record.owner_id, owner);
        assert!(record.stream_ref.ends_with(".mp3"));
        assert!(f.blobs.contains(&record.stream_ref).await);
        assert_eq!(f.library.get(&owner, &record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn non_audio_upload_is_rejected() {
        let f = fixture();
        let mut bad = upload("doc");
        bad.content_type = "application/pdf".to_string();

        let result = f.library.upload(&UserId::new("alice"), bad).await;
        assert!(matches!(result, Err(ServerError::Validation(_))));
        assert!(f.blobs.is_empty().await);
    }

    #[tokio::test]
    async fn blob_failure_writes_no_metadata() {
        let f = fixture();
        f.blobs.reject_writes(true);

        let result = f.library.upload(&UserId::new("alice"), upload("take")).await;
        assert!(matches!(result, Err(ServerError::BlobStore(_))));
        assert_eq!(f.store.audio_count().await, 0);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let f = fixture();
        let owner = UserId::new("alice");
        let first = f.library.upload(&owner, upload("first")).await.unwrap();
        f.clock.advance(Duration::seconds(5));
        let second = f.library.upload(&owner, upload("second")).await.unwrap();

        let ids: Vec<AudioId> = f.library.list(&owner).await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn rename_requires_ownership() {
        let f = fixture();
        let record = f.library.upload(&UserId::new("alice"), upload("take")).await.unwrap();

        let result = f.library.rename(&UserId::new("bob"), &record.id, "Mine now").await;
        assert!(matches!(result, Err(ServerError::AudioNotFound)));

        let renamed = f
            .library
            .rename(&UserId::new("alice"), &record.id, "Final")
            .await
            .unwrap();
        assert_eq!(renamed.display_name, "Final");
        assert_eq!(
            f.library.get(&UserId::new("alice"), &record.id).await.unwrap().display_name,
            "Final"
        );
    }

    #[tokio::test]
    async fn delete_reaps_unshared_blob() {
        let f = fixture();
        let owner = UserId::new("alice");
        let record = f.library.upload(&owner, upload("take")).await.unwrap();

        f.library.delete(&owner, &record.id).await.unwrap();
        assert!(matches!(f.library.get(&owner, &record.id).await, Err(ServerError::AudioNotFound)));

        let (_, blobs) = f.drain().await;
        assert!(!blobs.contains(&record.stream_ref).await);
    }

    #[tokio::test]
    async fn delete_keeps_blob_shared_with_copies() {
        let f = fixture();
        let alice = UserId::new("alice");
        let record = f.library.upload(&alice, upload("take")).await.unwrap();
        let copy = record.shared_copy(UserId::new("bob"), alice.clone(), Utc::now());
        f.store.insert(copy.clone()).await.unwrap();

        f.library.delete(&alice, &record.id).await.unwrap();

        let (store, blobs) = f.drain().await;
        assert!(blobs.contains(&record.stream_ref).await);
        assert!(store.get_by_id(&copy.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_of_foreign_audio_is_not_found() {
        let f = fixture();
        let record = f.library.upload(&UserId::new("alice"), upload("take")).await.unwrap();

        let result = f.library.delete(&UserId::new("bob"), &record.id).await;
        assert!(matches!(result, Err(ServerError::AudioNotFound)));
        assert!(f.library.get(&UserId::new("alice"), &record.id).await.is_ok());
    }

    #[tokio::test]
    async fn get_of_foreign_audio_is_not_found() {
        let f = fixture();
        let record = f.library.upload(&UserId::new("alice"), upload("take")).await.unwrap();

        let result = f.library.get(&UserId::new("bob"), &record.id).await;
        assert!(matches!(result, Err(ServerError::AudioNotFound)));
    }
}
