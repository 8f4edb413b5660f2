//! services/api/src/web/stats.rs
//!
//! Skill progression and standalone transcription for the signed-in user.

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use debaide_core::ports::StoredAudio;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::practice::read_upload;
use crate::web::protocol::{TranscriptionResponse, UserStatsResponse};
use crate::web::state::AppState;

/// GET /user/stats - The caller's progression record
#[utoipa::path(
    get,
    path = "/user/stats",
    responses(
        (status = 200, description = "Counters, averages and streaks", body = UserStatsResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = [])),
    tag = "stats"
)]
pub async fn user_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<UserStatsResponse>, ApiError> {
    let stats = state.stats.fetch_or_create(user_id).await?;
    Ok(Json(UserStatsResponse::from(&stats)))
}

/// POST /stt/transcribe - Transcribe an audio file without storing it
#[utoipa::path(
    post,
    path = "/stt/transcribe",
    request_body(content_type = "multipart/form-data", description = "The audio file to transcribe."),
    responses(
        (status = 200, description = "The transcript", body = TranscriptionResponse),
        (status = 400, description = "Missing or empty file"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = [])),
    tag = "stats"
)]
pub async fn transcribe_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let (file_name, bytes) = read_upload(&mut multipart).await?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded audio is empty".to_string()));
    }

    info!("User {} requested a transcription of {} ({} bytes).", user_id, file_name, bytes.len());
    let audio = StoredAudio {
        reference: format!("upload:{}", file_name),
        file_name,
        bytes,
    };
    let transcription = state.transcriber.transcribe(&audio).await;
    Ok(Json(TranscriptionResponse {
        text: transcription.text,
    }))
}
