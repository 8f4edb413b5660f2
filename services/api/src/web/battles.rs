//! services/api/src/web/battles.rs
//!
//! Handlers for 1v1 battles. Every route here sits behind `require_auth`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::protocol::{
    AvailableBattleResponse, BattleResponse, BattleSegmentRequest, BattleSegmentResponse, BattleStatusResponse,
    CreateBattleRequest, JudgmentResponse, SubmissionResponse,
};
use crate::web::state::AppState;

/// POST /battle/create - Open a battle and wait for an opponent
#[utoipa::path(
    post,
    path = "/battle/create",
    request_body = CreateBattleRequest,
    responses(
        (status = 201, description = "Battle opened", body = BattleResponse),
        (status = 400, description = "Invalid stance"),
        (status = 404, description = "Unknown topic")
    ),
    security(("bearer" = [])),
    tag = "battles"
)]
pub async fn create_battle_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateBattleRequest>,
) -> Result<(StatusCode, Json<BattleResponse>), ApiError> {
    let (battle, topic) = state.battles.create_battle(user_id, req.topic_id, &req.stance).await?;
    Ok((StatusCode::CREATED, Json(BattleResponse::new(&battle, &topic))))
}

/// POST /battle/{battle_id}/join - Take the open seat
#[utoipa::path(
    post,
    path = "/battle/{battle_id}/join",
    params(("battle_id" = Uuid, Path, description = "The battle to join")),
    responses(
        (status = 200, description = "Joined; the battle is in progress", body = BattleResponse),
        (status = 404, description = "Unknown battle"),
        (status = 409, description = "Battle is not waiting, or it is your own")
    ),
    security(("bearer" = [])),
    tag = "battles"
)]
pub async fn join_battle_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<BattleResponse>, ApiError> {
    let (battle, topic) = state.battles.join_battle(user_id, battle_id).await?;
    Ok(Json(BattleResponse::new(&battle, &topic)))
}

/// GET /battle/available - Waiting battles opened by other users
#[utoipa::path(
    get,
    path = "/battle/available",
    responses(
        (status = 200, description = "Joinable battles, oldest first", body = [AvailableBattleResponse])
    ),
    security(("bearer" = [])),
    tag = "battles"
)]
pub async fn available_battles_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<AvailableBattleResponse>>, ApiError> {
    let listed = state.battles.available(user_id).await?;

    let mut response = Vec::with_capacity(listed.len());
    for (battle, topic) in listed {
        let creator = state.db.get_user_by_id(battle.player1_id).await?;
        response.push(AvailableBattleResponse {
            battle_id: battle.id,
            topic: (&topic).into(),
            creator_id: creator.id,
            creator_username: creator.username,
            creator_stance: battle.player1_stance.as_str().to_string(),
            created_at: battle.created_at,
        });
    }
    Ok(Json(response))
}

/// GET /battle/{battle_id}/status - A participant's view of the battle
#[utoipa::path(
    get,
    path = "/battle/{battle_id}/status",
    params(("battle_id" = Uuid, Path, description = "The battle")),
    responses(
        (status = 200, description = "Current state of the battle", body = BattleStatusResponse),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Unknown battle")
    ),
    security(("bearer" = [])),
    tag = "battles"
)]
pub async fn battle_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<BattleStatusResponse>, ApiError> {
    let overview = state.battles.overview(battle_id, user_id).await?;
    Ok(Json(overview.into()))
}

/// GET /battle/{battle_id}/segments - Every segment submitted so far
#[utoipa::path(
    get,
    path = "/battle/{battle_id}/segments",
    params(("battle_id" = Uuid, Path, description = "The battle")),
    responses(
        (status = 200, description = "Segments in submission order", body = [BattleSegmentResponse]),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Unknown battle")
    ),
    security(("bearer" = [])),
    tag = "battles"
)]
pub async fn battle_segments_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<Vec<BattleSegmentResponse>>, ApiError> {
    let segments = state.battles.segments(battle_id, user_id).await?;
    Ok(Json(segments.into_iter().map(BattleSegmentResponse::from).collect()))
}

/// POST /battle/{battle_id}/segment - Submit the segment the battle is waiting for
#[utoipa::path(
    post,
    path = "/battle/{battle_id}/segment",
    params(("battle_id" = Uuid, Path, description = "The battle")),
    request_body = BattleSegmentRequest,
    responses(
        (status = 200, description = "Segment accepted", body = SubmissionResponse),
        (status = 400, description = "Unknown kind or empty text"),
        (status = 403, description = "Not your turn, or not a participant"),
        (status = 409, description = "Battle not in progress, or wrong segment kind")
    ),
    security(("bearer" = [])),
    tag = "battles"
)]
pub async fn submit_battle_segment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(battle_id): Path<Uuid>,
    Json(req): Json<BattleSegmentRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let receipt = state
        .battles
        .submit_segment(battle_id, user_id, &req.kind, &req.text)
        .await?;
    Ok(Json(receipt.into()))
}

/// POST /battle/{battle_id}/judge - Ask the AI judge for a verdict
#[utoipa::path(
    post,
    path = "/battle/{battle_id}/judge",
    params(("battle_id" = Uuid, Path, description = "The battle")),
    responses(
        (status = 200, description = "Battle judged and completed", body = JudgmentResponse),
        (status = 403, description = "Not a participant"),
        (status = 409, description = "Battle not in progress, or a player is missing segments"),
        (status = 502, description = "The judge failed or replied with an unusable verdict")
    ),
    security(("bearer" = [])),
    tag = "battles"
)]
pub async fn judge_battle_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<JudgmentResponse>, ApiError> {
    let outcome = state.battles.judge_battle(battle_id, user_id).await?;
    Ok(Json(outcome.into()))
}
