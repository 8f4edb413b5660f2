//! crates/debaide_core/src/practice.rs
//!
//! Solo practice sessions: start, append segments (text or audio), score once.

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    PracticeSession, ScoredSegment, Scorecard, ScoringRequest, Segment, SegmentDraft, SegmentKind,
    SessionStatus, Stance, Topic,
};
use crate::error::{ArenaError, ArenaResult};
use crate::ledger::parse_kind;
use crate::locks::KeyedLocks;
use crate::ports::{DatabaseService, DebateScorer, SpeechToTextService, StorageService, StoredAudio};
use crate::stats::StatsAggregator;

/// Everything stored for one session.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    pub session: PracticeSession,
    pub segments: Vec<Segment>,
    pub scorecard: Option<Scorecard>,
}

/// `"{session_id}/{kind}_{uuid}.{ext}"`, with `webm` when the upload has no extension.
pub fn audio_routing_key(session_id: Uuid, kind: SegmentKind, file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("webm");
    format!("{}/{}_{}.{}", session_id, kind, Uuid::new_v4(), ext)
}

pub struct PracticePipeline {
    db: Arc<dyn DatabaseService>,
    scorer: Arc<dyn DebateScorer>,
    storage: Arc<dyn StorageService>,
    transcriber: Arc<dyn SpeechToTextService>,
    stats: Arc<StatsAggregator>,
    locks: KeyedLocks<Uuid>,
}

impl PracticePipeline {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        scorer: Arc<dyn DebateScorer>,
        storage: Arc<dyn StorageService>,
        transcriber: Arc<dyn SpeechToTextService>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            db,
            scorer,
            storage,
            transcriber,
            stats,
            locks: KeyedLocks::new(),
        }
    }

    /// Opens a session on an existing topic with a randomly drawn stance.
    pub async fn start_session(&self, topic_id: i64, owner: Option<Uuid>) -> ArenaResult<(PracticeSession, Topic)> {
        let topic = self.db.get_topic(topic_id).await?;
        let stance = if rand::thread_rng().gen_bool(0.5) {
            Stance::Pro
        } else {
            Stance::Con
        };
        let session = self.db.create_session(topic.id, owner, stance).await?;
        info!("Practice session {} started on topic {} ({}).", session.id, topic.id, stance);
        Ok((session, topic))
    }

    pub async fn submit_text_segment(&self, session_id: Uuid, kind: &str, text: &str) -> ArenaResult<Segment> {
        let kind = parse_kind(kind)?;
        let draft = SegmentDraft::from_text(kind, text)?;

        let _guard = self.locks.lock(session_id).await;
        self.check_open_slot(session_id, kind).await?;
        let segment = self.db.append_segment(session_id, &draft).await?;
        info!("Session {}: {} recorded from text ({:.1}s).", session_id, kind, segment.duration);
        Ok(segment)
    }

    /// Stores the audio, transcribes it and appends the result. A failed transcription
    /// still yields a segment carrying the placeholder transcript.
    pub async fn submit_audio_segment(
        &self,
        session_id: Uuid,
        kind: &str,
        file_name: &str,
        bytes: Bytes,
    ) -> ArenaResult<Segment> {
        let kind = parse_kind(kind)?;
        if bytes.is_empty() {
            return Err(ArenaError::InvalidInput("Uploaded audio is empty".to_string()));
        }

        let _guard = self.locks.lock(session_id).await;
        self.check_open_slot(session_id, kind).await?;

        let routing_key = audio_routing_key(session_id, kind, file_name);
        let reference = self.storage.store(bytes.clone(), &routing_key).await?;
        let audio = StoredAudio {
            reference: reference.clone(),
            file_name: file_name.to_string(),
            bytes,
        };
        let transcription = self.transcriber.transcribe(&audio).await;
        let draft = SegmentDraft::from_transcription(kind, reference, transcription);

        let segment = self.db.append_segment(session_id, &draft).await?;
        info!("Session {}: {} recorded from audio ({:.1}s).", session_id, kind, segment.duration);
        Ok(segment)
    }

    /// Scores a session once. Later calls return the stored scorecard without
    /// calling the scorer again.
    pub async fn score_session(&self, session_id: Uuid) -> ArenaResult<Scorecard> {
        let _guard = self.locks.lock(session_id).await;

        let session = self.db.get_session(session_id).await?;
        if let Some(existing) = self.db.get_scorecard(session_id).await? {
            return Ok(existing);
        }

        let segments = self.db.get_segments_for_session(session_id).await?;
        if segments.is_empty() {
            return Err(ArenaError::InvalidState("No segments found for session".to_string()));
        }
        let topic = self.db.get_topic(session.topic_id).await?;

        let request = ScoringRequest {
            topic: topic.title.clone(),
            stance: session.stance,
            segments: segments
                .iter()
                .map(|s| ScoredSegment {
                    kind: s.kind,
                    transcript: s.transcript.clone(),
                    duration: s.duration,
                })
                .collect(),
        };
        let outcome = self.scorer.score(&request).await;

        let scorecard = Scorecard {
            session_id,
            scores: outcome.scores.clamped(),
            feedback: outcome.feedback,
            highlights: outcome.highlights,
            drills: outcome.drills,
            created_at: Utc::now(),
        };
        self.db.complete_session(&scorecard).await?;
        info!("Session {} scored {:.1}/20.", session_id, scorecard.scores.total);

        if let Some(owner) = session.user_id {
            if let Err(e) = self.stats.record_practice(owner, &scorecard, &segments, topic.id).await {
                warn!("Session {} scored but stats update failed: {}", session_id, e);
            }
        }
        Ok(scorecard)
    }

    pub async fn history(&self, session_id: Uuid) -> ArenaResult<SessionHistory> {
        let session = self.db.get_session(session_id).await?;
        let segments = self.db.get_segments_for_session(session_id).await?;
        let scorecard = self.db.get_scorecard(session_id).await?;
        Ok(SessionHistory {
            session,
            segments,
            scorecard,
        })
    }

    async fn check_open_slot(&self, session_id: Uuid, kind: SegmentKind) -> ArenaResult<()> {
        let session = self.db.get_session(session_id).await?;
        if session.status == SessionStatus::Completed {
            return Err(ArenaError::InvalidState(
                "Session has already been scored".to_string(),
            ));
        }
        let segments = self.db.get_segments_for_session(session_id).await?;
        if segments.iter().any(|s| s.kind == kind) {
            return Err(ArenaError::InvalidState(format!(
                "Session already has a {} segment",
                kind
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_keys_keep_the_upload_extension() {
        let session = Uuid::new_v4();
        let key = audio_routing_key(session, SegmentKind::Rebuttal, "take-2.m4a");
        assert!(key.starts_with(&format!("{}/rebuttal_", session)));
        assert!(key.ends_with(".m4a"));

        let bare = audio_routing_key(session, SegmentKind::Opening, "recording");
        assert!(bare.ends_with(".webm"));
    }
}
