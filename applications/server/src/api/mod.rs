/// API route modules
pub mod audio;
pub mod health;
pub mod share;
pub mod stream;
pub mod user;

use crate::{middleware, state::AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Build the full HTTP surface over `app_state`
pub fn router(app_state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/user/login", post(user::login))
        .route("/user/register", post(user::register))
        .route("/user/verify", post(user::verify));

    // Protected routes (current session required)
    let protected_routes = Router::new()
        .route("/user/logout", post(user::logout))
        .route(
            "/audio/upload/:user_id",
            post(audio::upload_audio).layer(DefaultBodyLimit::max(app_state.max_upload_bytes)),
        )
        .route("/audio/all/:user_id", get(audio::list_audio))
        .route("/audio/delete/:user_id/:audio_id", delete(audio::delete_audio))
        .route("/audio/update/:user_id/:audio_id/:name", put(audio::rename_audio))
        .route("/audio/share/create", post(share::create_share))
        .route("/audio/share/:share_id/:user_id", post(share::redeem_share))
        .route("/audio/:audio_id", get(audio::get_audio))
        .route("/audio/:audio_id/stream", get(stream::stream_audio))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth_middleware,
        ));

    public_routes
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
