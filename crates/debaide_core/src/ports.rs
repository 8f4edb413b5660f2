//! crates/debaide_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the debate engine.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or AI APIs.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Battle, BattleSegment, NewTopic, PracticeSession, Scorecard, ScoringOutcome, ScoringRequest,
    Segment, SegmentDraft, SegmentKind, Stance, Topic, User, UserCredentials, UserStats,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint or a guarded update did not hold.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The battle fields a turn was validated against. A turn write only commits
/// while the stored battle still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnGuard {
    pub current_turn: Uuid,
    pub current_segment: SegmentKind,
}

impl TurnGuard {
    pub fn of(battle: &Battle) -> Self {
        Self {
            current_turn: battle.current_turn,
            current_segment: battle.current_segment,
        }
    }
}

//=========================================================================================
// Persistence Port
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users & Auth ---
    /// Fails with `Conflict` when the username or email is already registered.
    async fn create_user(&self, username: &str, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(&self, token: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> PortResult<()>;

    /// Resolves a live token to its user, or `Unauthorized`.
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, token: &str) -> PortResult<()>;

    // --- Topic Catalog ---
    async fn list_topics(&self) -> PortResult<Vec<Topic>>;

    async fn get_topic(&self, topic_id: i64) -> PortResult<Topic>;

    /// The most recently created topic with `created_at >= since`.
    async fn latest_topic_since(&self, since: DateTime<Utc>) -> PortResult<Option<Topic>>;

    async fn create_topic(&self, topic: &NewTopic) -> PortResult<Topic>;

    // --- Practice Sessions ---
    async fn create_session(&self, topic_id: i64, user_id: Option<Uuid>, stance: Stance) -> PortResult<PracticeSession>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<PracticeSession>;

    /// Fails with `Conflict` if the session already holds a segment of this kind.
    async fn append_segment(&self, session_id: Uuid, draft: &SegmentDraft) -> PortResult<Segment>;

    /// Segments in submission order.
    async fn get_segments_for_session(&self, session_id: Uuid) -> PortResult<Vec<Segment>>;

    async fn get_scorecard(&self, session_id: Uuid) -> PortResult<Option<Scorecard>>;

    /// Stores the scorecard and marks the session completed in one commit.
    /// Fails with `Conflict` if a scorecard already exists.
    async fn complete_session(&self, scorecard: &Scorecard) -> PortResult<()>;

    // --- Battles ---
    /// Deletes every `waiting` battle created by the same player and inserts the new one,
    /// in one commit. Returns how many waiting battles were discarded.
    async fn open_battle(&self, battle: &Battle) -> PortResult<u64>;

    async fn get_battle(&self, battle_id: Uuid) -> PortResult<Battle>;

    /// Waiting battles not created by `excluding`, oldest first.
    async fn list_waiting_battles(&self, excluding: Uuid) -> PortResult<Vec<Battle>>;

    /// Persists a join. Fails with `Conflict` unless the stored battle is still waiting
    /// without a second player.
    async fn join_battle(&self, battle: &Battle) -> PortResult<()>;

    /// Appends the segment and stores the battle's new turn/stage in one commit.
    /// Fails with `Conflict` (and commits nothing) if the stored battle no longer
    /// matches `guard` or the (player, kind) pair already exists.
    async fn record_battle_turn(
        &self,
        battle: &Battle,
        guard: TurnGuard,
        player_id: Uuid,
        draft: &SegmentDraft,
    ) -> PortResult<BattleSegment>;

    /// Segments in submission order.
    async fn get_battle_segments(&self, battle_id: Uuid) -> PortResult<Vec<BattleSegment>>;

    /// Stores status, winner, judgment and completion time. Fails with `Conflict`
    /// unless the stored battle is still in progress.
    async fn finalize_battle(&self, battle: &Battle) -> PortResult<()>;

    // --- Statistics ---
    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<Option<UserStats>>;

    /// Creates an empty stats row unless one exists, then returns the stored row.
    async fn ensure_user_stats(&self, user_id: Uuid) -> PortResult<UserStats>;

    /// Applies `update` to the user's stats while holding the row, creating an
    /// empty row first when needed. Concurrent updates for one user never
    /// overwrite each other.
    async fn update_user_stats(
        &self,
        user_id: Uuid,
        update: &(dyn for<'s> Fn(&'s mut UserStats) + Send + Sync),
    ) -> PortResult<UserStats>;
}

//=========================================================================================
// External Collaborator Ports
//=========================================================================================

/// Audio that has already been handed to storage.
#[derive(Debug, Clone)]
pub struct StoredAudio {
    /// The storage reference (URL or path).
    pub reference: String,
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    /// Zero when the backend could not measure it.
    pub duration_seconds: f64,
}

impl Transcription {
    /// The placeholder returned when transcription fails.
    pub fn placeholder() -> Self {
        Self {
            text: "[Transcription failed - please check your audio file]".to_string(),
            duration_seconds: 5.0,
        }
    }
}

#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    /// Transcribes stored audio. Never fails: backends return a placeholder instead.
    async fn transcribe(&self, audio: &StoredAudio) -> Transcription;
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Stores the bytes under `routing_key` and returns a stable reference string.
    async fn store(&self, bytes: Bytes, routing_key: &str) -> PortResult<String>;
}

#[async_trait]
pub trait DebateScorer: Send + Sync {
    /// Scores one practice session. Never fails: backends fall back to
    /// `ScoringOutcome::fallback()`.
    async fn score(&self, request: &ScoringRequest) -> ScoringOutcome;
}

#[async_trait]
pub trait DebateJudge: Send + Sync {
    /// Sends the judging prompt and returns the raw (possibly code-fenced) verdict text.
    async fn judge(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait TopicGenerator: Send + Sync {
    /// Produces a fresh topic. Never fails: backends fall back to `NewTopic::fallback()`.
    async fn generate(&self) -> NewTopic;
}
