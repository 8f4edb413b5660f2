//! crates/debaide_core/src/domain.rs
//!
//! Defines the core data structures for the debate arena.
//! These structs are independent of any database, and only derive serde where
//! their content travels as structured JSON (scorecards, verdicts, stats maps).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ArenaError;

//=========================================================================================
// Enumerations
//=========================================================================================

/// One timed unit of debate speech. The order of the variants is the order of play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Opening,
    Rebuttal,
    Closing,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 3] = [SegmentKind::Opening, SegmentKind::Rebuttal, SegmentKind::Closing];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Opening => "opening",
            SegmentKind::Rebuttal => "rebuttal",
            SegmentKind::Closing => "closing",
        }
    }

    /// The stage that follows this one, or `None` after the closing.
    pub fn next(self) -> Option<SegmentKind> {
        match self {
            SegmentKind::Opening => Some(SegmentKind::Rebuttal),
            SegmentKind::Rebuttal => Some(SegmentKind::Closing),
            SegmentKind::Closing => None,
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentKind {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opening" => Ok(SegmentKind::Opening),
            "rebuttal" => Ok(SegmentKind::Rebuttal),
            "closing" => Ok(SegmentKind::Closing),
            other => Err(ArenaError::InvalidKind(other.to_string())),
        }
    }
}

/// The side of the resolution a debater argues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Pro,
    Con,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Pro => "pro",
            Stance::Con => "con",
        }
    }

    pub fn opposite(self) -> Stance {
        match self {
            Stance::Pro => Stance::Con,
            Stance::Con => Stance::Pro,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stance {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pro" => Ok(Stance::Pro),
            "con" => Ok(Stance::Con),
            _ => Err(ArenaError::InvalidInput("Stance must be 'pro' or 'con'".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ArenaError::InvalidInput(format!("Unknown difficulty '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(ArenaError::InvalidInput(format!("Unknown session status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Waiting,
    InProgress,
    Completed,
}

impl BattleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattleStatus::Waiting => "waiting",
            BattleStatus::InProgress => "in_progress",
            BattleStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BattleStatus {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(BattleStatus::Waiting),
            "in_progress" => Ok(BattleStatus::InProgress),
            "completed" => Ok(BattleStatus::Completed),
            other => Err(ArenaError::InvalidInput(format!("Unknown battle status '{}'", other))),
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Topics
//=========================================================================================

/// A debate resolution. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// A topic that has not been persisted yet (seed data or AI output).
#[derive(Debug, Clone, PartialEq)]
pub struct NewTopic {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: String,
}

impl NewTopic {
    pub fn new(title: &str, description: &str, difficulty: Difficulty, category: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            difficulty,
            category: category.to_string(),
        }
    }

    /// The topic handed out when generation is unavailable.
    pub fn fallback() -> Self {
        Self::new(
            "Artificial intelligence will improve quality of life more than it will harm it",
            "This topic explores the balance between AI's benefits and risks as it becomes increasingly integrated into daily life.",
            Difficulty::Medium,
            "technology",
        )
    }
}

//=========================================================================================
// Practice Sessions, Segments and Scorecards
//=========================================================================================

/// A solo practice session.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    pub id: Uuid,
    pub topic_id: i64,
    pub user_id: Option<Uuid>,
    pub stance: Stance,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A segment not yet written to a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDraft {
    pub kind: SegmentKind,
    pub transcript: String,
    pub audio_url: Option<String>,
    pub duration: f64,
}

/// One submitted speech within a practice session.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: i64,
    pub session_id: Uuid,
    pub kind: SegmentKind,
    pub transcript: String,
    pub audio_url: Option<String>,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

/// Four sub-scores in [0,5] and a total in [0,20].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub structure: f64,
    pub logic: f64,
    pub delivery: f64,
    pub time_use: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    pub const MAX_SUB_SCORE: f64 = 5.0;
    pub const MAX_TOTAL: f64 = 20.0;

    /// Pulls every value back into its documented range.
    pub fn clamped(self) -> Self {
        let sub = |v: f64| if v.is_finite() { v.clamp(0.0, Self::MAX_SUB_SCORE) } else { 0.0 };
        Self {
            structure: sub(self.structure),
            logic: sub(self.logic),
            delivery: sub(self.delivery),
            time_use: sub(self.time_use),
            total: if self.total.is_finite() { self.total.clamp(0.0, Self::MAX_TOTAL) } else { 0.0 },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub summary: String,
}

/// A notable moment in a practice transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(default)]
    pub timestamp: f64,
    pub text: String,
    #[serde(default)]
    pub reason: String,
}

/// What the AI scorer returns for one practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub scores: ScoreBreakdown,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    /// Drills are free-form: plain strings or `{drill_name, description}` objects.
    #[serde(default)]
    pub drills: Vec<serde_json::Value>,
}

impl ScoringOutcome {
    /// Flat mid-range scores used whenever the scorer cannot produce a real evaluation.
    pub fn fallback() -> Self {
        Self {
            scores: ScoreBreakdown {
                structure: 3.0,
                logic: 3.0,
                delivery: 3.0,
                time_use: 3.0,
                total: 12.0,
            },
            feedback: Feedback {
                strengths: vec!["You completed all segments".to_string(), "Good effort".to_string()],
                improvements: vec!["Practice more".to_string(), "Work on clarity".to_string()],
                summary: "Keep practicing to improve your debate skills.".to_string(),
            },
            highlights: Vec::new(),
            drills: vec![
                "Practice outlining arguments in advance".into(),
                "Record yourself and listen back".into(),
                "Time your segments during practice".into(),
            ],
        }
    }
}

/// One segment as presented to the scorer.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSegment {
    pub kind: SegmentKind,
    pub transcript: String,
    pub duration: f64,
}

/// The full context the scorer evaluates.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringRequest {
    pub topic: String,
    pub stance: Stance,
    pub segments: Vec<ScoredSegment>,
}

/// The stored evaluation of a practice session. Created once, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Scorecard {
    pub session_id: Uuid,
    pub scores: ScoreBreakdown,
    pub feedback: Feedback,
    pub highlights: Vec<Highlight>,
    pub drills: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Battles
//=========================================================================================

/// A 1v1 turn-based debate. Transition rules live in `crate::battle`.
#[derive(Debug, Clone, PartialEq)]
pub struct Battle {
    pub id: Uuid,
    pub topic_id: i64,
    pub player1_id: Uuid,
    pub player2_id: Option<Uuid>,
    pub player1_stance: Stance,
    pub player2_stance: Option<Stance>,
    pub status: BattleStatus,
    pub current_turn: Uuid,
    pub current_segment: SegmentKind,
    pub winner_id: Option<Uuid>,
    pub judgment: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One submitted speech within a battle.
#[derive(Debug, Clone)]
pub struct BattleSegment {
    pub id: i64,
    pub battle_id: Uuid,
    pub player_id: Uuid,
    pub kind: SegmentKind,
    pub transcript: String,
    pub audio_url: Option<String>,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Statistics
//=========================================================================================

/// Per-user progression record. Update rules live in `crate::stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub user_id: Uuid,
    pub total_practice_sessions: u32,
    pub completed_practice_sessions: u32,
    pub average_practice_score: f64,
    pub avg_structure_score: f64,
    pub avg_logic_score: f64,
    pub avg_delivery_score: f64,
    pub avg_time_use_score: f64,
    pub total_battles: u32,
    pub battles_won: u32,
    pub battles_lost: u32,
    pub current_win_streak: u32,
    pub best_win_streak: u32,
    /// Seconds.
    pub total_debate_time: f64,
    pub last_activity: DateTime<Utc>,
    /// Stored but never derived.
    pub favorite_stance: Option<Stance>,
    /// topic id -> number of completed debates on it
    pub topics_debated: BTreeMap<i64, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_kinds_advance_in_fixed_order() {
        assert_eq!(SegmentKind::Opening.next(), Some(SegmentKind::Rebuttal));
        assert_eq!(SegmentKind::Rebuttal.next(), Some(SegmentKind::Closing));
        assert_eq!(SegmentKind::Closing.next(), None);
    }

    #[test]
    fn parsing_rejects_unknown_kinds_and_stances() {
        assert_eq!("rebuttal".parse::<SegmentKind>().unwrap(), SegmentKind::Rebuttal);
        assert!(matches!("cross_exam".parse::<SegmentKind>(), Err(ArenaError::InvalidKind(_))));
        assert_eq!("con".parse::<Stance>().unwrap(), Stance::Con);
        assert!(matches!("neutral".parse::<Stance>(), Err(ArenaError::InvalidInput(_))));
        assert_eq!(Stance::Pro.opposite(), Stance::Con);
    }

    #[test]
    fn clamping_keeps_scores_in_range() {
        let wild = ScoreBreakdown { structure: 7.5, logic: -1.0, delivery: f64::NAN, time_use: 4.0, total: 31.0 };
        let tamed = wild.clamped();
        assert_eq!(tamed.structure, 5.0);
        assert_eq!(tamed.logic, 0.0);
        assert_eq!(tamed.delivery, 0.0);
        assert_eq!(tamed.time_use, 4.0);
        assert_eq!(tamed.total, 20.0);
    }

    #[test]
    fn scoring_outcome_tolerates_sparse_json() {
        let json = r#"{"scores":{"structure":4,"logic":3.5,"delivery":3,"time_use":2,"total":12.5},
                      "drills":["Shadow a recorded debate", {"drill_name":"Timer","description":"60s rebuttals"}]}"#;
        let outcome: ScoringOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(outcome.scores.total, 12.5);
        assert!(outcome.highlights.is_empty());
        assert_eq!(outcome.drills.len(), 2);
        assert_eq!(outcome.feedback, Feedback::default());
    }
}
