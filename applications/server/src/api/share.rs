/// Share ticket API routes
use crate::{
    api::audio::AudioView,
    error::{Result, ServerError},
    middleware::AuthenticatedUser,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tape_core::{AudioId, TicketId, UserId};

/// Placeholder some clients send before a user has logged in
const LOGGED_OUT_MARKER: &str = "undefined";

#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    pub audio_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateShareResponse {
    #[serde(rename = "_id")]
    pub id: TicketId,
}

/// POST /audio/share/create
pub async fn create_share(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<CreateShareRequest>,
) -> Result<(StatusCode, Json<CreateShareResponse>)> {
    let from_user = UserId::new(req.user_id);
    auth.ensure_is(&from_user)?;

    let ticket = app_state
        .shares
        .create_ticket(AudioId::new(req.audio_id), from_user)
        .await?;

    Ok((StatusCode::CREATED, Json(CreateShareResponse { id: ticket.id })))
}

/// POST /audio/share/:share_id/:user_id
///
/// Copies the shared clip into `user_id`'s collection and returns the copy.
pub async fn redeem_share(
    Path((share_id, user_id)): Path<(String, String)>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<AudioView>> {
    if user_id == LOGGED_OUT_MARKER {
        return Err(ServerError::Validation("User not logged in".to_string()));
    }

    let to_user = UserId::new(user_id);
    auth.ensure_is(&to_user)?;

    let record = app_state
        .shares
        .redeem_ticket(&TicketId::new(share_id), &to_user)
        .await?;

    Ok(Json(record.into()))
}
