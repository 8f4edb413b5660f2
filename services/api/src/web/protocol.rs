//! services/api/src/web/protocol.rs
//!
//! Defines the JSON request and response bodies of the HTTP API, and how the
//! domain types are rendered into them.

use chrono::{DateTime, Utc};
use debaide_core::domain::{
    Battle, BattleSegment, Highlight, PracticeSession, Scorecard, Segment, SegmentKind, Topic, User, UserStats,
};
use debaide_core::{BattleOverview, JudgmentOutcome, SessionHistory, SubmissionReceipt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Accounts
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned on register and login. The token is also set as the `session` cookie.
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

//=========================================================================================
// Topics
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct TopicResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Topic> for TopicResponse {
    fn from(topic: &Topic) -> Self {
        Self {
            id: topic.id,
            title: topic.title.clone(),
            description: topic.description.clone(),
            difficulty: topic.difficulty.as_str().to_string(),
            category: topic.category.clone(),
            created_at: topic.created_at,
        }
    }
}

//=========================================================================================
// Practice Sessions
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StartSessionRequest {
    pub topic_id: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub topic_title: String,
    pub topic_description: String,
    pub stance: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TextSegmentRequest {
    pub session_id: Uuid,
    /// One of `opening`, `rebuttal`, `closing`.
    pub kind: String,
    pub text: String,
}

#[derive(Deserialize, IntoParams)]
pub struct UploadSegmentQuery {
    pub session_id: Uuid,
    pub kind: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ScoreSessionRequest {
    pub session_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct SegmentResponse {
    pub id: i64,
    pub session_id: Uuid,
    pub kind: String,
    pub transcript: String,
    pub audio_url: Option<String>,
    /// Seconds.
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

impl From<Segment> for SegmentResponse {
    fn from(segment: Segment) -> Self {
        Self {
            id: segment.id,
            session_id: segment.session_id,
            kind: segment.kind.as_str().to_string(),
            transcript: segment.transcript,
            audio_url: segment.audio_url,
            duration: segment.duration,
            created_at: segment.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ScoresResponse {
    pub structure: f64,
    pub logic: f64,
    pub delivery: f64,
    pub time_use: f64,
    pub total: f64,
}

#[derive(Serialize, ToSchema)]
pub struct FeedbackResponse {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub summary: String,
}

#[derive(Serialize, ToSchema)]
pub struct HighlightResponse {
    pub timestamp: f64,
    pub text: String,
    pub reason: String,
}

impl From<Highlight> for HighlightResponse {
    fn from(h: Highlight) -> Self {
        Self {
            timestamp: h.timestamp,
            text: h.text,
            reason: h.reason,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ScorecardResponse {
    pub session_id: Uuid,
    pub scores: ScoresResponse,
    pub feedback: FeedbackResponse,
    pub highlights: Vec<HighlightResponse>,
    /// Plain strings or `{drill_name, description}` objects.
    #[schema(value_type = Vec<Object>)]
    pub drills: Vec<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<Scorecard> for ScorecardResponse {
    fn from(card: Scorecard) -> Self {
        Self {
            session_id: card.session_id,
            scores: ScoresResponse {
                structure: card.scores.structure,
                logic: card.scores.logic,
                delivery: card.scores.delivery,
                time_use: card.scores.time_use,
                total: card.scores.total,
            },
            feedback: FeedbackResponse {
                strengths: card.feedback.strengths,
                improvements: card.feedback.improvements,
                summary: card.feedback.summary,
            },
            highlights: card.highlights.into_iter().map(HighlightResponse::from).collect(),
            drills: card.drills,
            created_at: card.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub topic_id: i64,
    pub user_id: Option<Uuid>,
    pub stance: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PracticeSession> for SessionResponse {
    fn from(session: PracticeSession) -> Self {
        Self {
            id: session.id,
            topic_id: session.topic_id,
            user_id: session.user_id,
            stance: session.stance.as_str().to_string(),
            status: session.status.as_str().to_string(),
            created_at: session.created_at,
            completed_at: session.completed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SessionHistoryResponse {
    pub session: SessionResponse,
    pub segments: Vec<SegmentResponse>,
    pub scorecard: Option<ScorecardResponse>,
}

impl From<SessionHistory> for SessionHistoryResponse {
    fn from(history: SessionHistory) -> Self {
        Self {
            session: history.session.into(),
            segments: history.segments.into_iter().map(SegmentResponse::from).collect(),
            scorecard: history.scorecard.map(ScorecardResponse::from),
        }
    }
}

//=========================================================================================
// Battles
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateBattleRequest {
    pub topic_id: i64,
    /// `pro` or `con`.
    pub stance: String,
}

#[derive(Deserialize, ToSchema)]
pub struct BattleSegmentRequest {
    pub kind: String,
    pub text: String,
}

/// A battle as seen right after creating or joining it.
#[derive(Serialize, ToSchema)]
pub struct BattleResponse {
    pub battle_id: Uuid,
    pub topic: TopicResponse,
    pub status: String,
    pub player1_id: Uuid,
    pub player2_id: Option<Uuid>,
    pub player1_stance: String,
    pub player2_stance: Option<String>,
    pub current_turn: Uuid,
    pub current_segment: String,
}

impl BattleResponse {
    pub fn new(battle: &Battle, topic: &Topic) -> Self {
        Self {
            battle_id: battle.id,
            topic: topic.into(),
            status: battle.status.as_str().to_string(),
            player1_id: battle.player1_id,
            player2_id: battle.player2_id,
            player1_stance: battle.player1_stance.as_str().to_string(),
            player2_stance: battle.player2_stance.map(|s| s.as_str().to_string()),
            current_turn: battle.current_turn,
            current_segment: battle.current_segment.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AvailableBattleResponse {
    pub battle_id: Uuid,
    pub topic: TopicResponse,
    pub creator_id: Uuid,
    pub creator_username: String,
    pub creator_stance: String,
    pub created_at: DateTime<Utc>,
}

fn kind_names(kinds: &[SegmentKind]) -> Vec<String> {
    kinds.iter().map(|k| k.as_str().to_string()).collect()
}

#[derive(Serialize, ToSchema)]
pub struct BattleStatusResponse {
    pub battle_id: Uuid,
    pub topic: TopicResponse,
    pub status: String,
    pub player1_id: Uuid,
    pub player2_id: Option<Uuid>,
    pub player1_stance: String,
    pub player2_stance: Option<String>,
    pub current_turn: Uuid,
    pub current_segment: String,
    pub player1_segments: Vec<String>,
    pub player2_segments: Vec<String>,
    pub is_your_turn: bool,
    pub winner_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub judgment: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<BattleOverview> for BattleStatusResponse {
    fn from(view: BattleOverview) -> Self {
        let battle = view.battle;
        Self {
            battle_id: battle.id,
            topic: (&view.topic).into(),
            status: battle.status.as_str().to_string(),
            player1_id: battle.player1_id,
            player2_id: battle.player2_id,
            player1_stance: battle.player1_stance.as_str().to_string(),
            player2_stance: battle.player2_stance.map(|s| s.as_str().to_string()),
            current_turn: battle.current_turn,
            current_segment: battle.current_segment.as_str().to_string(),
            player1_segments: kind_names(&view.player1_segments),
            player2_segments: kind_names(&view.player2_segments),
            is_your_turn: view.is_your_turn,
            winner_id: battle.winner_id,
            judgment: battle.judgment,
            created_at: battle.created_at,
            completed_at: battle.completed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BattleSegmentResponse {
    pub id: i64,
    pub battle_id: Uuid,
    pub player_id: Uuid,
    pub kind: String,
    pub transcript: String,
    pub audio_url: Option<String>,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

impl From<BattleSegment> for BattleSegmentResponse {
    fn from(segment: BattleSegment) -> Self {
        Self {
            id: segment.id,
            battle_id: segment.battle_id,
            player_id: segment.player_id,
            kind: segment.kind.as_str().to_string(),
            transcript: segment.transcript,
            audio_url: segment.audio_url,
            duration: segment.duration,
            created_at: segment.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub segment: BattleSegmentResponse,
    pub current_turn: Uuid,
    pub current_segment: String,
}

impl From<SubmissionReceipt> for SubmissionResponse {
    fn from(receipt: SubmissionReceipt) -> Self {
        Self {
            segment: receipt.segment.into(),
            current_turn: receipt.current_turn,
            current_segment: receipt.current_segment.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct JudgmentResponse {
    pub battle_id: Uuid,
    pub winner_id: Uuid,
    pub winner_username: String,
    #[schema(value_type = Object)]
    pub judgment: Value,
}

impl From<JudgmentOutcome> for JudgmentResponse {
    fn from(outcome: JudgmentOutcome) -> Self {
        Self {
            battle_id: outcome.battle.id,
            winner_id: outcome.winner_id,
            winner_username: outcome.winner_username,
            judgment: outcome.judgment,
        }
    }
}

//=========================================================================================
// Statistics and Transcription
//=========================================================================================

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Serialize, ToSchema)]
pub struct SkillScoresResponse {
    pub structure: f64,
    pub logic: f64,
    pub delivery: f64,
    pub time_use: f64,
}

#[derive(Serialize, ToSchema)]
pub struct UserStatsResponse {
    pub total_practice_sessions: u32,
    pub completed_practice_sessions: u32,
    pub average_practice_score: f64,
    pub total_battles: u32,
    pub battles_won: u32,
    pub battles_lost: u32,
    /// Percent, one decimal place.
    pub win_rate: f64,
    pub current_win_streak: u32,
    pub best_win_streak: u32,
    pub skill_scores: SkillScoresResponse,
    /// Minutes, one decimal place.
    pub total_debate_time_minutes: f64,
    pub last_activity: DateTime<Utc>,
    pub favorite_stance: Option<String>,
    /// Topic id -> completed debates on it.
    pub topics_debated: BTreeMap<String, u32>,
}

impl From<&UserStats> for UserStatsResponse {
    fn from(stats: &UserStats) -> Self {
        Self {
            total_practice_sessions: stats.total_practice_sessions,
            completed_practice_sessions: stats.completed_practice_sessions,
            average_practice_score: round_to(stats.average_practice_score, 2),
            total_battles: stats.total_battles,
            battles_won: stats.battles_won,
            battles_lost: stats.battles_lost,
            win_rate: round_to(stats.win_rate(), 1),
            current_win_streak: stats.current_win_streak,
            best_win_streak: stats.best_win_streak,
            skill_scores: SkillScoresResponse {
                structure: round_to(stats.avg_structure_score, 2),
                logic: round_to(stats.avg_logic_score, 2),
                delivery: round_to(stats.avg_delivery_score, 2),
                time_use: round_to(stats.avg_time_use_score, 2),
            },
            total_debate_time_minutes: round_to(stats.total_debate_time / 60.0, 1),
            last_activity: stats.last_activity,
            favorite_stance: stats.favorite_stance.map(|s| s.as_str().to_string()),
            topics_debated: stats
                .topics_debated
                .iter()
                .map(|(topic_id, n)| (topic_id.to_string(), *n))
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TranscriptionResponse {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_are_rounded_for_display() {
        let mut stats = UserStats::new(Uuid::new_v4(), Utc::now());
        stats.average_practice_score = 13.456;
        stats.avg_logic_score = 3.333_333;
        stats.total_battles = 3;
        stats.battles_won = 2;
        stats.total_debate_time = 125.0;
        stats.topics_debated.insert(7, 2);

        let view = UserStatsResponse::from(&stats);
        assert_eq!(view.average_practice_score, 13.46);
        assert_eq!(view.skill_scores.logic, 3.33);
        assert_eq!(view.win_rate, 66.7);
        assert_eq!(view.total_debate_time_minutes, 2.1);
        assert_eq!(view.topics_debated.get("7"), Some(&2));
    }

    #[test]
    fn win_rate_is_zero_without_battles() {
        let stats = UserStats::new(Uuid::new_v4(), Utc::now());
        assert_eq!(UserStatsResponse::from(&stats).win_rate, 0.0);
    }
}
