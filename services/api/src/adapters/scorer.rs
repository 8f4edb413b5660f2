//! services/api/src/adapters/scorer.rs
//!
//! Practice scoring backends. Both implement the `DebateScorer` port; neither
//! ever fails, since a weak scorecard beats a lost session.

use async_trait::async_trait;
use debaide_core::domain::{ScoringOutcome, ScoringRequest};
use debaide_core::ports::DebateScorer;
use tracing::{info, warn};

use super::llm::{extract_json_object, ChatModel};

const SCORING_SYSTEM_PROMPT: &str =
    "You are an expert debate coach. Respond with a single JSON object and nothing else.";

/// Renders the coaching prompt for one practice session.
pub fn build_scoring_prompt(request: &ScoringRequest) -> String {
    let transcript = request
        .segments
        .iter()
        .map(|seg| {
            format!(
                "**{}** ({}s):\n{}",
                seg.kind.as_str().to_uppercase(),
                seg.duration,
                seg.transcript
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an expert debate coach scoring a practice debate. Analyze the following debate performance.

**Topic:** {topic}
**Stance:** {stance}

**Debate Transcript:**
{transcript}

Provide a structured evaluation in JSON format with:

1. **scores** (object):
   - structure: 0-5 (organization, clarity of arguments)
   - logic: 0-5 (reasoning, evidence, coherence)
   - delivery: 0-5 (confidence, pace, articulation)
   - time_use: 0-5 (pacing, time management)
   - total: 0-20 (sum of above)

2. **feedback** (object with detailed coaching):
   - strengths: List 2-3 specific strengths
   - improvements: List 2-3 areas to improve
   - summary: 2-3 sentence overall assessment

3. **highlights** (array of 2-3 key moments):
   Each with: timestamp (float seconds), text (key phrase), reason (why it's notable)

4. **drills** (array of 3-4 practice exercises):
   Specific, actionable drills to improve weak areas

Be constructive, specific, and encouraging. Focus on actionable feedback."#,
        topic = request.topic,
        stance = request.stance,
        transcript = transcript,
    )
}

/// Parses a model reply into an outcome, or `None` if it is not usable.
pub fn parse_scoring_reply(reply: &str) -> Option<ScoringOutcome> {
    let body = extract_json_object(reply)?;
    match serde_json::from_str::<ScoringOutcome>(body) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("Scoring reply did not match the expected shape: {}", e);
            None
        }
    }
}

//=========================================================================================
// LLM-backed Scorer
//=========================================================================================

#[derive(Clone)]
pub struct LlmScorer {
    chat: ChatModel,
}

impl LlmScorer {
    pub fn new(chat: ChatModel) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl DebateScorer for LlmScorer {
    async fn score(&self, request: &ScoringRequest) -> ScoringOutcome {
        let prompt = build_scoring_prompt(request);
        info!("Scoring {} segment(s) with {}.", request.segments.len(), self.chat.model());

        match self.chat.complete(SCORING_SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => parse_scoring_reply(&reply).unwrap_or_else(|| {
                warn!("Falling back to default scoring after an unusable reply.");
                ScoringOutcome::fallback()
            }),
            Err(e) => {
                warn!("Scoring call failed, using fallback scores: {}", e);
                ScoringOutcome::fallback()
            }
        }
    }
}

//=========================================================================================
// Offline Scorer
//=========================================================================================

/// Used when no AI backend is configured.
#[derive(Clone, Default)]
pub struct OfflineScorer;

#[async_trait]
impl DebateScorer for OfflineScorer {
    async fn score(&self, _request: &ScoringRequest) -> ScoringOutcome {
        info!("Using fallback scoring (no AI backend configured).");
        ScoringOutcome::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debaide_core::domain::{ScoredSegment, SegmentKind, Stance};

    fn request() -> ScoringRequest {
        ScoringRequest {
            topic: "Remote work should be the default".to_string(),
            stance: Stance::Con,
            segments: vec![
                ScoredSegment {
                    kind: SegmentKind::Opening,
                    transcript: "Offices build trust.".to_string(),
                    duration: 42.5,
                },
                ScoredSegment {
                    kind: SegmentKind::Closing,
                    transcript: "Keep the office.".to_string(),
                    duration: 30.0,
                },
            ],
        }
    }

    #[test]
    fn prompt_lists_each_segment_with_its_duration() {
        let prompt = build_scoring_prompt(&request());
        assert!(prompt.contains("**Topic:** Remote work should be the default"));
        assert!(prompt.contains("**Stance:** con"));
        assert!(prompt.contains("**OPENING** (42.5s):\nOffices build trust."));
        assert!(prompt.contains("**CLOSING** (30s):\nKeep the office."));
    }

    #[test]
    fn fenced_replies_are_parsed() {
        let reply = "```json\n{\"scores\":{\"structure\":4,\"logic\":4,\"delivery\":3,\"time_use\":5,\"total\":16},\
                     \"feedback\":{\"strengths\":[\"Clear\"],\"improvements\":[],\"summary\":\"Solid.\"}}\n```";
        let outcome = parse_scoring_reply(reply).unwrap();
        assert_eq!(outcome.scores.total, 16.0);
        assert_eq!(outcome.feedback.summary, "Solid.");
    }

    #[test]
    fn replies_without_scores_are_rejected() {
        assert!(parse_scoring_reply("{\"feedback\":{}}").is_none());
        assert!(parse_scoring_reply("I cannot score this.").is_none());
    }

    #[tokio::test]
    async fn offline_scorer_returns_the_fallback() {
        assert_eq!(OfflineScorer.score(&request()).await, ScoringOutcome::fallback());
    }
}
