/// Authentication middleware
use crate::{error::ServerError, services::Session, state::AppState};
use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tape_core::UserId;

/// Extension type to store the authenticated session in the request
/// Can be used as an extractor in handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Session);

impl AuthenticatedUser {
    pub fn user_id(&self) -> &UserId {
        &self.0.user_id
    }

    /// Reject requests whose path names a different user
    pub fn ensure_is(&self, path_user: &UserId) -> Result<(), ServerError> {
        if self.user_id() == path_user {
            Ok(())
        } else {
            Err(ServerError::Forbidden(
                "Cannot act on behalf of another user".to_string(),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer token from the Authorization header, or `?token=` for media
/// elements that cannot set headers
fn extract_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(q)| q.token)
    })
}

/// Middleware that accepts only the user's current, unexpired session token
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = extract_token(&request).ok_or(ServerError::Unauthenticated)?;

    let session = app_state.sessions.authenticate(&token).await.map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        e
    })?;

    request.extensions_mut().insert(AuthenticatedUser(session));

    Ok(next.run(request).await)
}

/// Implement FromRequestParts so AuthenticatedUser can be used as an extractor
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ServerError::Unauthenticated)
    }
}
