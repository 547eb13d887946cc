/// Audio streaming API
use crate::{
    error::{Result, ServerError},
    middleware::AuthenticatedUser,
    services::StreamRequest,
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::Response,
};
use tape_core::AudioId;

/// GET /audio/:audio_id/stream
/// Relay audio bytes from the blob store, passing `Range` through
pub async fn stream_audio(
    Path(audio_id): Path<String>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<Response> {
    let range = headers
        .get(header::RANGE)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| ServerError::Validation("Invalid Range header".to_string()))
        })
        .transpose()?;

    let request = StreamRequest {
        requester: auth.user_id().clone(),
        range,
    };

    let relayed = app_state
        .relay
        .stream(&AudioId::new(audio_id), &request)
        .await?;

    let mut response = Response::builder()
        .status(relayed.status)
        .body(Body::from_stream(relayed.body))
        .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)))?;
    *response.headers_mut() = relayed.headers;

    Ok(response)
}
