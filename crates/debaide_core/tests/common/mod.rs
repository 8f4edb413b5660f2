#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use debaide_core::domain::{
    Battle, Difficulty, Feedback, NewTopic, ScoreBreakdown, ScoringOutcome, ScoringRequest, Topic, User,
};
use debaide_core::ports::{
    DatabaseService, DebateJudge, DebateScorer, PortError, PortResult, SpeechToTextService, StorageService,
    StoredAudio, TopicGenerator, Transcription,
};
use debaide_core::{BattleEngine, MemoryStore, PracticePipeline, StatsAggregator, TopicCatalog};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

//=========================================================================================
// Fakes
//=========================================================================================

/// Returns scripted totals (sub-scores are a quarter each), 12.0 once the script runs out.
/// Yields before answering so concurrent callers get a chance to overlap.
#[derive(Default)]
pub struct CountingScorer {
    pub calls: AtomicUsize,
    totals: Mutex<VecDeque<f64>>,
}

impl CountingScorer {
    pub fn script(&self, totals: &[f64]) {
        self.totals.lock().unwrap().extend(totals.iter().copied());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DebateScorer for CountingScorer {
    async fn score(&self, request: &ScoringRequest) -> ScoringOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let total = self.totals.lock().unwrap().pop_front().unwrap_or(12.0);
        let quarter = total / 4.0;
        ScoringOutcome {
            scores: ScoreBreakdown {
                structure: quarter,
                logic: quarter,
                delivery: quarter,
                time_use: quarter,
                total,
            },
            feedback: Feedback {
                strengths: vec![format!("Covered {} segments", request.segments.len())],
                improvements: vec!["Cite a source".to_string()],
                summary: format!("Solid {} case on {}", request.stance, request.topic),
            },
            highlights: Vec::new(),
            drills: vec!["Rebuttal sprints".into()],
        }
    }
}

pub fn verdict_json(winner: &str) -> String {
    format!(
        r#"{{
  "player1_scores": {{"argument_strength": 7, "logic_reasoning": 7, "evidence": 6, "rebuttal": 6, "delivery": 7, "total": 33}},
  "player2_scores": {{"argument_strength": 8, "logic_reasoning": 8, "evidence": 7, "rebuttal": 8, "delivery": 7, "total": 38}},
  "winner": "{}",
  "decision_summary": "The stronger rebuttals decided it.",
  "player1_strengths": ["Clear structure"],
  "player1_weaknesses": ["Thin evidence"],
  "player2_strengths": ["Direct clash"],
  "player2_weaknesses": ["Rushed closing"]
}}"#,
        winner
    )
}

/// Replies from a script; once it is empty, awards the battle to player 2.
#[derive(Default)]
pub struct ScriptedJudge {
    pub calls: AtomicUsize,
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedJudge {
    pub fn reply(&self, raw: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(raw.into()));
    }

    pub fn fail(&self, reason: &str) {
        self.replies.lock().unwrap().push_back(Err(reason.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DebateJudge for ScriptedJudge {
    async fn judge(&self, prompt: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.contains("Return ONLY the JSON object"));
        tokio::task::yield_now().await;
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(reason)) => Err(PortError::Unexpected(reason)),
            None => Ok(format!("```json\n{}\n```", verdict_json("player2"))),
        }
    }
}

#[derive(Default)]
pub struct FixedTopicGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TopicGenerator for FixedTopicGenerator {
    async fn generate(&self) -> NewTopic {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        NewTopic::new(
            &format!("Cities should ban cars from their centers ({})", n),
            "Weigh congestion, air quality and access.",
            Difficulty::Medium,
            "politics",
        )
    }
}

pub struct StaticTranscriber {
    pub reply: Transcription,
}

#[async_trait]
impl SpeechToTextService for StaticTranscriber {
    async fn transcribe(&self, _audio: &StoredAudio) -> Transcription {
        self.reply.clone()
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub keys: Mutex<Vec<String>>,
}

#[async_trait]
impl StorageService for MemoryStorage {
    async fn store(&self, _bytes: Bytes, routing_key: &str) -> PortResult<String> {
        self.keys.lock().unwrap().push(routing_key.to_string());
        Ok(format!("/storage/audio/{}", routing_key))
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub scorer: Arc<CountingScorer>,
    pub judge: Arc<ScriptedJudge>,
    pub generator: Arc<FixedTopicGenerator>,
    pub storage: Arc<MemoryStorage>,
    pub stats: Arc<StatsAggregator>,
    pub catalog: TopicCatalog,
    pub practice: PracticePipeline,
    pub battles: BattleEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_transcription(Transcription {
            text: "We should act now because the evidence is truly overwhelming".to_string(),
            duration_seconds: 0.0,
        })
    }

    pub fn with_transcription(reply: Transcription) -> Self {
        let store = Arc::new(MemoryStore::new());
        let db: Arc<dyn DatabaseService> = store.clone();
        let scorer = Arc::new(CountingScorer::default());
        let judge = Arc::new(ScriptedJudge::default());
        let generator = Arc::new(FixedTopicGenerator::default());
        let storage = Arc::new(MemoryStorage::default());
        let transcriber = Arc::new(StaticTranscriber { reply });
        let stats = Arc::new(StatsAggregator::new(db.clone()));

        Self {
            catalog: TopicCatalog::new(db.clone(), generator.clone()),
            practice: PracticePipeline::new(db.clone(), scorer.clone(), storage.clone(), transcriber, stats.clone()),
            battles: BattleEngine::new(db, judge.clone(), stats.clone()),
            store,
            scorer,
            judge,
            generator,
            storage,
            stats,
        }
    }

    pub async fn topic(&self, title: &str) -> Topic {
        self.store
            .create_topic(&NewTopic::new(title, "Test topic", Difficulty::Medium, "technology"))
            .await
            .unwrap()
    }

    pub async fn user(&self, username: &str) -> User {
        self.store
            .create_user(username, &format!("{}@example.com", username), "not-a-real-hash")
            .await
            .unwrap()
    }

    /// Creates a battle as `p1` (pro) and joins it as `p2`.
    pub async fn started_battle(&self, topic_id: i64, p1: Uuid, p2: Uuid) -> Battle {
        let (battle, _) = self.battles.create_battle(p1, topic_id, "pro").await.unwrap();
        let (battle, _) = self.battles.join_battle(p2, battle.id).await.unwrap();
        battle
    }

    /// Plays all six segments in order.
    pub async fn play_through(&self, battle_id: Uuid, p1: Uuid, p2: Uuid) {
        for kind in ["opening", "rebuttal", "closing"] {
            for player in [p1, p2] {
                self.battles
                    .submit_segment(battle_id, player, kind, &format!("My {} argument, clearly stated.", kind))
                    .await
                    .unwrap();
            }
        }
    }
}
