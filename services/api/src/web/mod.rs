pub mod auth;
pub mod battles;
pub mod middleware;
pub mod practice;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod stats;
pub mod topics;

pub use middleware::require_auth;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiError;
use rest::ApiDoc;
use state::AppState;

/// Builds the complete application: public and protected routes, CORS, the
/// upload limit and the Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(rest::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/topics", get(topics::list_topics_handler))
        .route("/topics/daily", get(topics::daily_topic_handler))
        .route("/session/start", post(practice::start_session_handler))
        .route("/session/segment/text", post(practice::text_segment_handler))
        .route("/session/segment/upload", post(practice::upload_segment_handler))
        .route("/session/score", post(practice::score_session_handler))
        .route("/session/{session_id}/history", get(practice::session_history_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/user/stats", get(stats::user_stats_handler))
        .route("/stt/transcribe", post(stats::transcribe_handler))
        .route("/battle/create", post(battles::create_battle_handler))
        .route("/battle/available", get(battles::available_battles_handler))
        .route("/battle/{battle_id}/join", post(battles::join_battle_handler))
        .route("/battle/{battle_id}/status", get(battles::battle_status_handler))
        .route("/battle/{battle_id}/segments", get(battles::battle_segments_handler))
        .route("/battle/{battle_id}/segment", post(battles::submit_battle_segment_handler))
        .route("/battle/{battle_id}/judge", post(battles::judge_battle_handler))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), require_auth));

    let upload_limit = app_state.config.upload_limit_bytes;
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
