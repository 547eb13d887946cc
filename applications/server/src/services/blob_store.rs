/// Blob store clients for audio bytes
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::BlobSettings;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Blob store returned {status} for {key}")]
    Status { status: u16, key: String },

    /// The byte stream broke after it had started
    #[error("Blob stream interrupted: {0}")]
    Interrupted(String),

    #[error("Blob store unavailable: {0}")]
    Unavailable(String),
}

/// Upstream response for a read
///
/// Any status is returned as-is; deciding what counts as failure is up to the
/// caller. The body is lazy and ends when dropped.
pub struct BlobObject {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, Result<Bytes, BlobError>>,
}

impl std::fmt::Debug for BlobObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobObject")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Key-addressed byte storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Open a read, forwarding `range` (a raw `Range` header value) upstream
    async fn get(&self, key: &str, range: Option<&str>) -> Result<BlobObject, BlobError>;

    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<(), BlobError>;

    /// Deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Remote object service authenticated by a static `AccessKey` header
///
/// Reads go to `read_url` (normally a CDN), writes and deletes to `write_url`.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    read_url: String,
    write_url: String,
    access_key: String,
    timeout: Duration,
}

const ACCESS_KEY_HEADER: &str = "AccessKey";

impl HttpBlobStore {
    pub fn new(settings: &BlobSettings) -> Result<Self, BlobError> {
        let timeout = Duration::from_secs(settings.timeout_secs);

        // No overall timeout on the client: a streamed read lasts as long as
        // the listener keeps reading.
        let client = reqwest::Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            client,
            read_url: settings.read_url.trim_end_matches('/').to_string(),
            write_url: settings.write_url.trim_end_matches('/').to_string(),
            access_key: settings.access_key.clone(),
            timeout,
        })
    }

    fn read_location(&self, key: &str) -> String {
        format!("{}/{}", self.read_url, key)
    }

    fn write_location(&self, key: &str) -> String {
        format!("{}/{}", self.write_url, key)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str, range: Option<&str>) -> Result<BlobObject, BlobError> {
        let mut request = self
            .client
            .get(self.read_location(key))
            .header(ACCESS_KEY_HEADER, &self.access_key);
        if let Some(range) = range {
            request = request.header(reqwest::header::RANGE, range);
        }

        let response = request.send().await?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let headers = convert_headers(response.headers());
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(BlobError::from))
            .boxed();

        tracing::debug!(key, %status, "Opened blob read");
        Ok(BlobObject {
            status,
            headers,
            body,
        })
    }

    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<(), BlobError> {
        let size = data.len();
        let response = self
            .client
            .put(self.write_location(key))
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .timeout(self.timeout)
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BlobError::Status {
                status: response.status().as_u16(),
                key: key.to_string(),
            });
        }

        tracing::debug!(key, size, "Uploaded blob");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let response = self
            .client
            .delete(self.write_location(key))
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(BlobError::Status {
                status: status.as_u16(),
                key: key.to_string(),
            });
        }

        tracing::debug!(key, "Deleted blob");
        Ok(())
    }
}

/// reqwest 0.11 still carries http 0.2 header types
fn convert_headers(source: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        let converted = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        );
        if let (Ok(name), Ok(value)) = converted {
            headers.append(name, value);
        }
    }
    headers
}

/// Blob store held in process memory, used by `serve --ephemeral` and tests
#[derive(Debug)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
    read_chunk: usize,
    gets: AtomicUsize,
    reject_writes: AtomicBool,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: String,
    data: Bytes,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_read_chunk(16 * 1024)
    }

    /// Reads are served in pieces of `read_chunk` bytes
    pub fn with_read_chunk(read_chunk: usize) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            read_chunk: read_chunk.max(1),
            gets: AtomicUsize::new(0),
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Number of `get` calls served so far
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Make subsequent `put` calls fail
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str, range: Option<&str>) -> Result<BlobObject, BlobError> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let Some(blob) = self.blobs.read().await.get(key).cloned() else {
            return Ok(BlobObject {
                status: StatusCode::NOT_FOUND,
                headers: HeaderMap::new(),
                body: stream::empty().boxed(),
            });
        };

        let total = blob.data.len() as u64;
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&blob.content_type) {
            headers.insert(http::header::CONTENT_TYPE, value);
        }
        headers.insert(http::header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        let (status, data) = match range.and_then(|r| parse_range(r, total)) {
            Some((start, end)) => {
                let content_range = format!("bytes {}-{}/{}", start, end, total);
                if let Ok(value) = HeaderValue::from_str(&content_range) {
                    headers.insert(http::header::CONTENT_RANGE, value);
                }
                (
                    StatusCode::PARTIAL_CONTENT,
                    blob.data.slice(start as usize..=end as usize),
                )
            }
            None => (StatusCode::OK, blob.data),
        };
        headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(data.len()));

        let read_chunk = self.read_chunk;
        let body = stream::unfold(data, move |mut rest| async move {
            if rest.is_empty() {
                return None;
            }
            let chunk = rest.split_to(read_chunk.min(rest.len()));
            Some((Ok(chunk), rest))
        })
        .boxed();

        Ok(BlobObject {
            status,
            headers,
            body,
        })
    }

    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<(), BlobError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("writes rejected".to_string()));
        }

        self.blobs.write().await.insert(
            key.to_string(),
            StoredBlob {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.blobs.write().await.remove(key);
        Ok(())
    }
}

/// Parse HTTP Range header
/// Format: "bytes=start-end"
fn parse_range(range: &str, size: u64) -> Option<(u64, u64)> {
    let range = range.strip_prefix("bytes=")?;

    if let Some((start_str, end_str)) = range.split_once('-') {
        let start: u64 = start_str.parse().ok()?;
        let end: u64 = if end_str.is_empty() {
            size.checked_sub(1)?
        } else {
            end_str.parse::<u64>().ok()?.min(size.checked_sub(1)?)
        };

        if start <= end {
            return Some((start, end));
        }
    }

    None
}
