/// User account API routes
use crate::{
    error::Result,
    middleware::AuthenticatedUser,
    services::Session,
    state::AppState,
};
use axum::{extract::State, http::StatusCode, Form, Json};
use serde::{Deserialize, Serialize};
use tape_core::UserId;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub email: String,
    pub token: String,
    pub user_id: UserId,
    pub name: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            email: session.email,
            token: session.token,
            user_id: session.user_id,
            name: session.name,
        }
    }
}

/// POST /user/login
pub async fn login(
    State(app_state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<SessionResponse>> {
    let session = app_state.sessions.login(&form.email, &form.password).await?;
    Ok(Json(session.into()))
}

/// POST /user/register
pub async fn register(
    State(app_state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let session = app_state
        .sessions
        .register(&form.email, &form.name, &form.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// POST /user/verify
pub async fn verify(
    State(app_state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<SessionResponse>> {
    let session = app_state
        .sessions
        .verify_session(&UserId::new(req.user_id), &req.token)
        .await?;
    Ok(Json(session.into()))
}

/// POST /user/logout
pub async fn logout(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<StatusCode> {
    app_state.sessions.logout(auth.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
