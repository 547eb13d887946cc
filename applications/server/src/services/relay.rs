/// Streaming relay from the blob store to a client
use crate::error::{Result, ServerError};
use crate::services::blob_store::{BlobError, BlobStore};
use bytes::Bytes;
use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use http::{header, HeaderMap, HeaderValue, StatusCode};
use std::sync::Arc;
use tape_core::{AudioCatalog, AudioId, UserId};

/// Who is asking, and for which byte range
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub requester: UserId,
    /// Raw `Range` header from the client
    pub range: Option<String>,
}

/// A stream ready to hand to the HTTP layer
///
/// `body` yields at most one error and then ends. Dropping it releases the
/// upstream connection.
pub struct RelayedStream {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, std::result::Result<Bytes, BlobError>>,
}

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Clone)]
pub struct StreamRelay {
    catalog: Arc<dyn AudioCatalog>,
    blobs: Arc<dyn BlobStore>,
    chunk_size: usize,
}

impl StreamRelay {
    pub fn new(catalog: Arc<dyn AudioCatalog>, blobs: Arc<dyn BlobStore>, chunk_size: usize) -> Self {
        Self {
            catalog,
            blobs,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Open `audio_id` for reading on behalf of `request.requester`
    ///
    /// Fails with `AudioNotFound` before touching the blob store when the id
    /// is unknown or belongs to someone else. Any upstream failure before the
    /// first byte is `UpstreamUnavailable`.
    pub async fn stream(&self, audio_id: &AudioId, request: &StreamRequest) -> Result<RelayedStream> {
        let record = self
            .catalog
            .get_by_id(audio_id)
            .await?
            .filter(|record| record.owner_id == request.requester)
            .ok_or(ServerError::AudioNotFound)?;

        let object = self
            .blobs
            .get(&record.stream_ref, request.range.as_deref())
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(e.to_string()))?;

        if !object.status.is_success() {
            return Err(ServerError::UpstreamUnavailable(format!(
                "blob store returned {} for {}",
                object.status, record.stream_ref
            )));
        }

        let mut upstream = object.body;
        let first = match upstream.next().await {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(e)) => return Err(ServerError::UpstreamUnavailable(e.to_string())),
            None => None,
        };

        tracing::debug!(
            audio_id = %audio_id,
            stream_ref = %record.stream_ref,
            status = %object.status,
            "Relaying audio stream"
        );

        let body = stream::iter(first.map(Ok)).chain(upstream);
        Ok(RelayedStream {
            status: object.status,
            headers: forwarded_headers(&object.headers),
            body: rechunk(body, self.chunk_size, audio_id.clone()),
        })
    }
}

fn forwarded_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    }
    headers
}

fn is_hop_by_hop(name: &header::HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Split oversized chunks and stop after the first error
fn rechunk<S>(
    upstream: S,
    chunk_size: usize,
    audio_id: AudioId,
) -> BoxStream<'static, std::result::Result<Bytes, BlobError>>
where
    S: futures_util::Stream<Item = std::result::Result<Bytes, BlobError>> + Send + 'static,
{
    upstream
        .flat_map(move |item| stream::iter(split_chunk(item, chunk_size)))
        .scan(false, move |failed, item| {
            if *failed {
                return future::ready(None);
            }
            if let Err(e) = &item {
                tracing::warn!(audio_id = %audio_id, "Audio stream interrupted: {}", e);
                *failed = true;
            }
            future::ready(Some(item))
        })
        .boxed()
}

fn split_chunk(
    item: std::result::Result<Bytes, BlobError>,
    chunk_size: usize,
) -> Vec<std::result::Result<Bytes, BlobError>> {
    match item {
        Ok(mut chunk) => {
            let mut pieces = Vec::with_capacity(chunk.len() / chunk_size + 1);
            while chunk.len() > chunk_size {
                pieces.push(Ok(chunk.split_to(chunk_size)));
            }
            if !chunk.is_empty() {
                pieces.push(Ok(chunk));
            }
            pieces
        }
        Err(e) => vec![Err(e)],
    }
}
