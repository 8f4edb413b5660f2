//! services/api/src/web/topics.rs

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::protocol::TopicResponse;
use crate::web::state::AppState;

/// GET /topics - Every topic in the catalog
#[utoipa::path(
    get,
    path = "/topics",
    responses(
        (status = 200, description = "All topics, oldest first", body = [TopicResponse])
    ),
    tag = "topics"
)]
pub async fn list_topics_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TopicResponse>>, ApiError> {
    let topics = state.catalog.list_topics().await?;
    Ok(Json(topics.iter().map(TopicResponse::from).collect()))
}

/// GET /topics/daily - Today's topic, generated on the first request of the day
#[utoipa::path(
    get,
    path = "/topics/daily",
    responses(
        (status = 200, description = "The topic of the day", body = TopicResponse)
    ),
    tag = "topics"
)]
pub async fn daily_topic_handler(State(state): State<Arc<AppState>>) -> Result<Json<TopicResponse>, ApiError> {
    let topic = state.catalog.daily_topic().await?;
    Ok(Json((&topic).into()))
}
