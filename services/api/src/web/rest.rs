//! services/api/src/web/rest.rs
//!
//! Contains the health endpoint and the master definition for the OpenAPI
//! specification.

use axum::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::web::protocol::*;
use crate::web::{auth, battles, practice, stats, topics};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        topics::list_topics_handler,
        topics::daily_topic_handler,
        practice::start_session_handler,
        practice::text_segment_handler,
        practice::upload_segment_handler,
        practice::score_session_handler,
        practice::session_history_handler,
        battles::create_battle_handler,
        battles::join_battle_handler,
        battles::available_battles_handler,
        battles::battle_status_handler,
        battles::battle_segments_handler,
        battles::submit_battle_segment_handler,
        battles::judge_battle_handler,
        stats::user_stats_handler,
        stats::transcribe_handler,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            TopicResponse,
            StartSessionRequest,
            StartSessionResponse,
            TextSegmentRequest,
            ScoreSessionRequest,
            SegmentResponse,
            ScoresResponse,
            FeedbackResponse,
            HighlightResponse,
            ScorecardResponse,
            SessionResponse,
            SessionHistoryResponse,
            CreateBattleRequest,
            BattleSegmentRequest,
            BattleResponse,
            AvailableBattleResponse,
            BattleStatusResponse,
            BattleSegmentResponse,
            SubmissionResponse,
            JudgmentResponse,
            SkillScoresResponse,
            UserStatsResponse,
            TranscriptionResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "debAIDe API", description = "Debate practice sessions, 1v1 battles and skill progression.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the protected routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

/// GET / - Liveness probe
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "debAIDe API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
