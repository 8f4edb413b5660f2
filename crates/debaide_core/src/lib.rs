pub mod battle;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod judging;
pub mod ledger;
pub mod locks;
pub mod memory;
pub mod ports;
pub mod practice;
pub mod stats;

pub use battle::{BattleEngine, BattleOverview, SubmissionReceipt};
pub use catalog::TopicCatalog;
pub use domain::{
    Battle, BattleSegment, BattleStatus, Difficulty, Feedback, Highlight, NewTopic, PracticeSession,
    ScoreBreakdown, Scorecard, ScoringOutcome, ScoringRequest, Segment, SegmentKind, SessionStatus, Stance,
    Topic, User, UserCredentials, UserStats,
};
pub use error::{ArenaError, ArenaResult};
pub use judging::JudgmentOutcome;
pub use memory::MemoryStore;
pub use ports::{
    DatabaseService, DebateJudge, DebateScorer, PortError, PortResult, SpeechToTextService, StorageService,
    StoredAudio, TopicGenerator, Transcription,
};
pub use practice::{PracticePipeline, SessionHistory};
pub use stats::StatsAggregator;
