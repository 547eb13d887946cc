/// Background blob deletion
use crate::services::blob_store::BlobStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Deletes blobs off the request path
///
/// Jobs are best-effort: a failed delete is logged and dropped. The worker
/// exits once every handle has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct BlobReaper {
    sender: mpsc::UnboundedSender<String>,
}

impl BlobReaper {
    /// Start the worker task
    pub fn spawn(blobs: Arc<dyn BlobStore>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

        let handle = tokio::spawn(async move {
            tracing::info!("Blob reaper started");
            while let Some(key) = receiver.recv().await {
                match blobs.delete(&key).await {
                    Ok(()) => tracing::info!(key = %key, "Deleted blob"),
                    Err(e) => tracing::warn!(key = %key, "Failed to delete blob: {}", e),
                }
            }
            tracing::info!("Blob reaper stopped");
        });

        (Self { sender }, handle)
    }

    /// Queue `key` for deletion
    pub fn enqueue(&self, key: impl Into<String>) {
        let key = key.into();
        tracing::debug!(key = %key, "Enqueued blob deletion");
        if self.sender.send(key).is_err() {
            tracing::warn!("Blob reaper is not running; deletion dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::blob_store::MemoryBlobStore;
    use bytes::Bytes;

    #[tokio::test]
    async fn queued_keys_are_deleted() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("a.mp3", "audio/mpeg", Bytes::from_static(b"a")).await.unwrap();
        blobs.put("b.mp3", "audio/mpeg", Bytes::from_static(b"b")).await.unwrap();

        let (reaper, handle) = BlobReaper::spawn(blobs.clone());
        reaper.enqueue("a.mp3");
        reaper.enqueue("missing.mp3");
        drop(reaper);
        handle.await.unwrap();

        assert!(!blobs.contains("a.mp3").await);
        assert!(blobs.contains("b.mp3").await);
    }
}
