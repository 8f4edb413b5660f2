//! services/api/src/web/practice.rs
//!
//! Handlers for solo practice sessions.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::identify;
use crate::web::protocol::{
    ScoreSessionRequest, ScorecardResponse, SegmentResponse, SessionHistoryResponse, StartSessionRequest,
    StartSessionResponse, TextSegmentRequest, UploadSegmentQuery,
};
use crate::web::state::AppState;

/// Reads the first file part of a multipart body.
pub(crate) async fn read_upload(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        return Ok((file_name, data));
    }
    Err(ApiError::BadRequest("Multipart form must include a file".to_string()))
}

/// POST /session/start - Open a practice session with a random stance
#[utoipa::path(
    post,
    path = "/session/start",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = StartSessionResponse),
        (status = 404, description = "Unknown topic")
    ),
    tag = "practice"
)]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let owner = identify(&state, &headers).await?;
    let (session, topic) = state.practice.start_session(req.topic_id, owner).await?;
    Ok(Json(StartSessionResponse {
        session_id: session.id,
        topic_title: topic.title,
        topic_description: topic.description,
        stance: session.stance.as_str().to_string(),
    }))
}

/// POST /session/segment/text - Submit a typed segment
#[utoipa::path(
    post,
    path = "/session/segment/text",
    request_body = TextSegmentRequest,
    responses(
        (status = 200, description = "Segment recorded", body = SegmentResponse),
        (status = 400, description = "Unknown kind or empty text"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Kind already submitted or session already scored")
    ),
    tag = "practice"
)]
pub async fn text_segment_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextSegmentRequest>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let segment = state
        .practice
        .submit_text_segment(req.session_id, &req.kind, &req.text)
        .await?;
    Ok(Json(segment.into()))
}

/// POST /session/segment/upload - Submit a recorded segment
#[utoipa::path(
    post,
    path = "/session/segment/upload",
    params(UploadSegmentQuery),
    request_body(content_type = "multipart/form-data", description = "The recorded audio file."),
    responses(
        (status = 200, description = "Segment stored and transcribed", body = SegmentResponse),
        (status = 400, description = "Unknown kind or missing file"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Kind already submitted or session already scored")
    ),
    tag = "practice"
)]
pub async fn upload_segment_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadSegmentQuery>,
    mut multipart: Multipart,
) -> Result<Json<SegmentResponse>, ApiError> {
    let (file_name, bytes) = read_upload(&mut multipart).await?;
    let segment = state
        .practice
        .submit_audio_segment(query.session_id, &query.kind, &file_name, bytes)
        .await?;
    Ok(Json(segment.into()))
}

/// POST /session/score - Score a session once
#[utoipa::path(
    post,
    path = "/session/score",
    request_body = ScoreSessionRequest,
    responses(
        (status = 200, description = "The session's scorecard", body = ScorecardResponse),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Session has no segments")
    ),
    tag = "practice"
)]
pub async fn score_session_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScoreSessionRequest>,
) -> Result<Json<ScorecardResponse>, ApiError> {
    let scorecard = state.practice.score_session(req.session_id).await?;
    Ok(Json(scorecard.into()))
}

/// GET /session/{session_id}/history - Session, segments and scorecard
#[utoipa::path(
    get,
    path = "/session/{session_id}/history",
    params(("session_id" = Uuid, Path, description = "The practice session")),
    responses(
        (status = 200, description = "Everything stored for the session", body = SessionHistoryResponse),
        (status = 404, description = "Unknown session")
    ),
    tag = "practice"
)]
pub async fn session_history_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionHistoryResponse>, ApiError> {
    let history = state.practice.history(session_id).await?;
    Ok(Json(history.into()))
}
