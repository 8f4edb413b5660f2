//! crates/debaide_core/src/judging.rs
//!
//! Turns a fully submitted battle into a verdict. The AI judge is called once;
//! anything it returns that does not parse into the verdict schema is a hard
//! failure and leaves the battle untouched.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::battle::{missing_kinds, BattleEngine};
use crate::domain::{Battle, BattleSegment, BattleStatus, SegmentKind, Topic};
use crate::error::{ArenaError, ArenaResult};

//=========================================================================================
// Verdict Schema
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinnerSide {
    Player1,
    Player2,
}

/// Per-debater criteria, each 0-10. Verdicts with scores outside that range
/// are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerScores {
    pub argument_strength: f64,
    pub logic_reasoning: f64,
    pub evidence: f64,
    pub rebuttal: f64,
    pub delivery: f64,
    #[serde(default)]
    pub total: Option<f64>,
}

impl PlayerScores {
    /// The stated total, or the sum of the criteria when the judge left it out.
    pub fn total(&self) -> f64 {
        self.total.unwrap_or(
            self.argument_strength + self.logic_reasoning + self.evidence + self.rebuttal + self.delivery,
        )
    }

    fn check(&self, side: &str) -> ArenaResult<()> {
        let criteria = [
            ("argument_strength", self.argument_strength),
            ("logic_reasoning", self.logic_reasoning),
            ("evidence", self.evidence),
            ("rebuttal", self.rebuttal),
            ("delivery", self.delivery),
        ];
        for (name, value) in criteria {
            if !value.is_finite() || !(0.0..=10.0).contains(&value) {
                return Err(ArenaError::UpstreamFailure(format!(
                    "Judge gave {} an out-of-range {} score: {}",
                    side, name, value
                )));
            }
        }
        match self.total {
            Some(total) if !total.is_finite() || !(0.0..=50.0).contains(&total) => Err(ArenaError::UpstreamFailure(
                format!("Judge gave {} an out-of-range total: {}", side, total),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Verdict {
    pub player1_scores: PlayerScores,
    pub player2_scores: PlayerScores,
    pub winner: WinnerSide,
    #[serde(default)]
    pub decision_summary: String,
    #[serde(default)]
    pub player1_strengths: Vec<String>,
    #[serde(default)]
    pub player1_weaknesses: Vec<String>,
    #[serde(default)]
    pub player2_strengths: Vec<String>,
    #[serde(default)]
    pub player2_weaknesses: Vec<String>,
}

/// Removes a leading ```` ```json ```` or ```` ``` ```` fence and a trailing ```` ``` ````.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parses the judge's reply into the typed verdict plus the verbatim JSON object.
pub fn parse_verdict(raw: &str) -> ArenaResult<(Verdict, Value)> {
    let body = strip_code_fences(raw);
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| ArenaError::UpstreamFailure(format!("Judge returned unparseable JSON: {}", e)))?;
    if !payload.is_object() {
        return Err(ArenaError::UpstreamFailure(
            "Judge returned JSON that is not an object".to_string(),
        ));
    }
    let verdict: Verdict = serde_json::from_value(payload.clone())
        .map_err(|e| ArenaError::UpstreamFailure(format!("Judge verdict does not match the schema: {}", e)))?;
    verdict.player1_scores.check("player1")?;
    verdict.player2_scores.check("player2")?;
    Ok((verdict, payload))
}

//=========================================================================================
// Prompt
//=========================================================================================

/// One side of the debate as the judge sees it.
pub struct Contender<'a> {
    pub name: &'a str,
    pub battle_stance: &'a str,
    pub speeches: BTreeMap<SegmentKind, &'a str>,
}

impl<'a> Contender<'a> {
    fn collect(name: &'a str, battle_stance: &'a str, player_id: Uuid, segments: &'a [BattleSegment]) -> Self {
        let speeches = segments
            .iter()
            .filter(|s| s.player_id == player_id)
            .map(|s| (s.kind, s.transcript.as_str()))
            .collect();
        Self { name, battle_stance, speeches }
    }

    fn render(&self) -> String {
        let speech = |kind: SegmentKind| self.speeches.get(&kind).copied().unwrap_or("");
        format!(
            "{} ({}):\nOpening: {}\nRebuttal: {}\nClosing: {}",
            self.name,
            self.battle_stance,
            speech(SegmentKind::Opening),
            speech(SegmentKind::Rebuttal),
            speech(SegmentKind::Closing)
        )
    }
}

pub fn build_judging_prompt(topic: &Topic, player1: &Contender<'_>, player2: &Contender<'_>) -> String {
    format!(
        r#"You are an expert debate judge evaluating a 1v1 debate.

Topic: {title}
Description: {description}

{player1}

{player2}

Evaluate both debaters on these criteria (0-10 points each):
1. Argument Strength - Quality and persuasiveness of arguments
2. Logic and Reasoning - Sound logic and valid reasoning
3. Evidence and Examples - Use of facts, data, and relevant examples
4. Rebuttal Quality - Effective counter-arguments and addressing opponent's points
5. Delivery and Clarity - Clear communication and structure

Provide your judgment in the following JSON format:
{{
  "player1_scores": {{
    "argument_strength": <0-10>,
    "logic_reasoning": <0-10>,
    "evidence": <0-10>,
    "rebuttal": <0-10>,
    "delivery": <0-10>,
    "total": <sum of all scores>
  }},
  "player2_scores": {{
    "argument_strength": <0-10>,
    "logic_reasoning": <0-10>,
    "evidence": <0-10>,
    "rebuttal": <0-10>,
    "delivery": <0-10>,
    "total": <sum of all scores>
  }},
  "winner": "<player1 or player2>",
  "decision_summary": "<2-3 sentences explaining the decision>",
  "player1_strengths": ["strength1", "strength2"],
  "player1_weaknesses": ["weakness1", "weakness2"],
  "player2_strengths": ["strength1", "strength2"],
  "player2_weaknesses": ["weakness1", "weakness2"]
}}

Return ONLY the JSON object, no additional text."#,
        title = topic.title,
        description = topic.description,
        player1 = player1.render(),
        player2 = player2.render(),
    )
}

//=========================================================================================
// Judging
//=========================================================================================

#[derive(Debug, Clone)]
pub struct JudgmentOutcome {
    pub battle: Battle,
    pub winner_id: Uuid,
    pub winner_username: String,
    pub judgment: Value,
}

fn incomplete(label: &str, missing: &[SegmentKind]) -> ArenaError {
    let names: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
    ArenaError::InvalidState(format!(
        "{} has not submitted all segments (missing: {})",
        label,
        names.join(", ")
    ))
}

impl BattleEngine {
    /// Judges a battle whose ledgers are complete and finalizes it.
    pub async fn judge_battle(&self, battle_id: Uuid, requester_id: Uuid) -> ArenaResult<JudgmentOutcome> {
        let _guard = self.locks.lock(battle_id).await;

        let mut battle = self.db.get_battle(battle_id).await?;
        if battle.status != BattleStatus::InProgress {
            return Err(ArenaError::InvalidState(format!(
                "Battle is not in progress (status: {})",
                battle.status
            )));
        }
        if !battle.is_participant(requester_id) {
            return Err(ArenaError::Forbidden(
                "You are not a participant in this battle".to_string(),
            ));
        }
        let Some(player2_id) = battle.player2_id else {
            return Err(ArenaError::InvalidState("Battle has no second player".to_string()));
        };

        let segments = self.db.get_battle_segments(battle_id).await?;
        let missing1 = missing_kinds(&segments, battle.player1_id);
        if !missing1.is_empty() {
            return Err(incomplete("Player 1", &missing1));
        }
        let missing2 = missing_kinds(&segments, player2_id);
        if !missing2.is_empty() {
            return Err(incomplete("Player 2", &missing2));
        }

        let topic = self.db.get_topic(battle.topic_id).await?;
        let name1 = self.display_name(battle.player1_id, "Player 1").await;
        let name2 = self.display_name(player2_id, "Player 2").await;
        let stance1 = battle.player1_stance.as_str();
        let stance2 = battle.player2_stance.map(|s| s.as_str()).unwrap_or("");

        let prompt = build_judging_prompt(
            &topic,
            &Contender::collect(&name1, stance1, battle.player1_id, &segments),
            &Contender::collect(&name2, stance2, player2_id, &segments),
        );

        info!("Requesting judgment for battle {}.", battle_id);
        let raw = self.judge.judge(&prompt).await.map_err(|e| {
            error!("Judge call failed for battle {}: {}", battle_id, e);
            ArenaError::UpstreamFailure(format!("AI judge unavailable: {}", e))
        })?;
        let (verdict, judgment) = parse_verdict(&raw).map_err(|e| {
            error!("Discarding judgment for battle {}: {}", battle_id, e);
            e
        })?;

        let (winner_id, winner_username) = match verdict.winner {
            WinnerSide::Player1 => (battle.player1_id, name1),
            WinnerSide::Player2 => (player2_id, name2),
        };

        battle.complete(winner_id, judgment.clone(), Utc::now());
        self.db.finalize_battle(&battle).await?;
        info!(
            "Battle {} judged: {} wins ({:.1} vs {:.1}).",
            battle_id,
            winner_username,
            verdict.player1_scores.total(),
            verdict.player2_scores.total()
        );

        if let Err(e) = self.stats.record_battle(&battle, &segments).await {
            warn!("Battle {} finalized but stats update failed: {}", battle_id, e);
        }

        Ok(JudgmentOutcome {
            battle,
            winner_id,
            winner_username,
            judgment,
        })
    }

    async fn display_name(&self, user_id: Uuid, fallback: &str) -> String {
        self.db
            .get_user_by_id(user_id)
            .await
            .map(|u| u.username)
            .unwrap_or_else(|_| fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERDICT: &str = r#"{
        "player1_scores": {"argument_strength": 8, "logic_reasoning": 7, "evidence": 6, "rebuttal": 7, "delivery": 8, "total": 36},
        "player2_scores": {"argument_strength": 6, "logic_reasoning": 6, "evidence": 5, "rebuttal": 6, "delivery": 7},
        "winner": "player1",
        "decision_summary": "Sharper rebuttals carried it."
    }"#;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn fenced_verdicts_parse_and_keep_the_raw_payload() {
        let fenced = format!("```json\n{}\n```", VERDICT);
        let (verdict, payload) = parse_verdict(&fenced).unwrap();
        assert_eq!(verdict.winner, WinnerSide::Player1);
        assert_eq!(verdict.player1_scores.total(), 36.0);
        assert_eq!(verdict.player2_scores.total(), 30.0);
        assert!(verdict.player1_strengths.is_empty());
        assert_eq!(payload["decision_summary"], "Sharper rebuttals carried it.");
    }

    #[test]
    fn boundary_scores_are_accepted() {
        let raw = r#"{
            "player1_scores": {"argument_strength": 10, "logic_reasoning": 10, "evidence": 10, "rebuttal": 10, "delivery": 10, "total": 50},
            "player2_scores": {"argument_strength": 0, "logic_reasoning": 0, "evidence": 0, "rebuttal": 0, "delivery": 0, "total": 0},
            "winner": "player1"
        }"#;
        let (verdict, _) = parse_verdict(raw).unwrap();
        assert_eq!(verdict.player1_scores.total(), 50.0);
        assert_eq!(verdict.player2_scores.total(), 0.0);
    }

    #[test]
    fn unusable_verdicts_are_upstream_failures() {
        for raw in [
            "The first debater clearly won.",
            "[1, 2, 3]",
            r#"{"winner": "player1"}"#,
            r#"{"player1_scores": {"argument_strength": 1, "logic_reasoning": 1, "evidence": 1, "rebuttal": 1, "delivery": 1},
                "player2_scores": {"argument_strength": 1, "logic_reasoning": 1, "evidence": 1, "rebuttal": 1, "delivery": 1},
                "winner": "draw"}"#,
            r#"{"player1_scores": {"argument_strength": 8, "logic_reasoning": 7, "evidence": 42, "rebuttal": 7, "delivery": 8},
                "player2_scores": {"argument_strength": 6, "logic_reasoning": 6, "evidence": 5, "rebuttal": 6, "delivery": 7},
                "winner": "player1"}"#,
            r#"{"player1_scores": {"argument_strength": 8, "logic_reasoning": 7, "evidence": 6, "rebuttal": 7, "delivery": 8},
                "player2_scores": {"argument_strength": -1, "logic_reasoning": 6, "evidence": 5, "rebuttal": 6, "delivery": 7},
                "winner": "player1"}"#,
            r#"{"player1_scores": {"argument_strength": 8, "logic_reasoning": 7, "evidence": 6, "rebuttal": 7, "delivery": 8, "total": 360},
                "player2_scores": {"argument_strength": 6, "logic_reasoning": 6, "evidence": 5, "rebuttal": 6, "delivery": 7},
                "winner": "player1"}"#,
        ] {
            assert!(matches!(parse_verdict(raw), Err(ArenaError::UpstreamFailure(_))), "{}", raw);
        }
    }
}
