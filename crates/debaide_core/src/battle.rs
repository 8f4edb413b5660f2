//! crates/debaide_core/src/battle.rs
//!
//! The battle turn-taking state machine.
//!
//! A battle moves `waiting -> in_progress -> completed` and never back. While in
//! progress the players alternate inside a stage (opening, rebuttal, closing).
//! Once both players have submitted the active stage, the next stage opens and
//! player 1 always takes the first move again, regardless of who finished the
//! previous stage. After both closings the battle sits at `closing` until judged.
//!
//! The transition rules are pure methods on [`Battle`]; [`BattleEngine`] wraps them
//! with persistence and a per-battle lock so that the read-check-append-update
//! sequence of a submission is never interleaved with another one.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Battle, BattleSegment, BattleStatus, SegmentDraft, SegmentKind, Stance, Topic,
};
use crate::error::{ArenaError, ArenaResult};
use crate::ledger::parse_kind;
use crate::locks::KeyedLocks;
use crate::ports::{DatabaseService, DebateJudge, TurnGuard};
use crate::stats::StatsAggregator;

//=========================================================================================
// Pure Transition Rules
//=========================================================================================

impl Battle {
    /// A fresh battle in `waiting`. The creator always opens.
    pub fn open(topic_id: i64, creator_id: Uuid, stance: Stance, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic_id,
            player1_id: creator_id,
            player2_id: None,
            player1_stance: stance,
            player2_stance: None,
            status: BattleStatus::Waiting,
            current_turn: creator_id,
            current_segment: SegmentKind::Opening,
            winner_id: None,
            judgment: None,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.player1_id == user_id || self.player2_id == Some(user_id)
    }

    /// The other participant, if `player_id` is one and the seat is filled.
    pub fn opponent_of(&self, player_id: Uuid) -> Option<Uuid> {
        if player_id == self.player1_id {
            self.player2_id
        } else if self.player2_id == Some(player_id) {
            Some(self.player1_id)
        } else {
            None
        }
    }

    pub fn stance_of(&self, player_id: Uuid) -> Option<Stance> {
        if player_id == self.player1_id {
            Some(self.player1_stance)
        } else if self.player2_id == Some(player_id) {
            self.player2_stance
        } else {
            None
        }
    }

    /// Seats the joiner on the opposite side. The turn stays with player 1.
    pub fn join(&mut self, joiner_id: Uuid) -> ArenaResult<()> {
        if self.status != BattleStatus::Waiting {
            return Err(ArenaError::InvalidState(format!(
                "Battle is not accepting players (status: {})",
                self.status
            )));
        }
        if joiner_id == self.player1_id {
            return Err(ArenaError::InvalidState("Cannot join your own battle".to_string()));
        }
        if self.player2_id.is_some() {
            return Err(ArenaError::InvalidState("Battle is full".to_string()));
        }
        self.player2_id = Some(joiner_id);
        self.player2_stance = Some(self.player1_stance.opposite());
        self.status = BattleStatus::InProgress;
        Ok(())
    }

    /// Checks status, participation, turn and stage, in that order.
    pub fn check_submission(&self, player_id: Uuid, kind: SegmentKind) -> ArenaResult<()> {
        if self.status != BattleStatus::InProgress {
            return Err(ArenaError::InvalidState(format!(
                "Battle is not in progress (status: {})",
                self.status
            )));
        }
        if !self.is_participant(player_id) {
            return Err(ArenaError::Forbidden(
                "You are not a participant in this battle".to_string(),
            ));
        }
        if self.current_turn != player_id {
            return Err(ArenaError::Forbidden(format!(
                "It's not your turn: waiting on {} to submit the {}",
                self.current_turn, self.current_segment
            )));
        }
        if kind != self.current_segment {
            return Err(ArenaError::InvalidState(format!(
                "Current segment is {}, not {}",
                self.current_segment, kind
            )));
        }
        Ok(())
    }

    /// Applies an accepted submission. `submitted_of_kind` is the number of
    /// segments of `kind` in this battle including the one just accepted.
    pub fn apply_submission(&mut self, player_id: Uuid, kind: SegmentKind, submitted_of_kind: usize) {
        if let Some(opponent) = self.opponent_of(player_id) {
            self.current_turn = opponent;
        }
        if submitted_of_kind >= 2 {
            if let Some(next) = kind.next() {
                self.current_segment = next;
                self.current_turn = self.player1_id;
            }
        }
    }

    /// Marks the battle completed with its winner and verbatim judgment.
    pub fn complete(&mut self, winner_id: Uuid, judgment: serde_json::Value, now: DateTime<Utc>) {
        self.status = BattleStatus::Completed;
        self.winner_id = Some(winner_id);
        self.judgment = Some(judgment);
        self.completed_at = Some(now);
    }
}

/// The stages `player_id` has not yet submitted, in play order.
pub fn missing_kinds(segments: &[BattleSegment], player_id: Uuid) -> Vec<SegmentKind> {
    let submitted: BTreeSet<SegmentKind> = segments
        .iter()
        .filter(|s| s.player_id == player_id)
        .map(|s| s.kind)
        .collect();
    SegmentKind::ALL
        .into_iter()
        .filter(|k| !submitted.contains(k))
        .collect()
}

/// The stages `player_id` has submitted, in play order.
pub fn submitted_kinds(segments: &[BattleSegment], player_id: Uuid) -> Vec<SegmentKind> {
    let missing = missing_kinds(segments, player_id);
    SegmentKind::ALL
        .into_iter()
        .filter(|k| !missing.contains(k))
        .collect()
}

//=========================================================================================
// Engine
//=========================================================================================

/// The result of an accepted battle submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub segment: BattleSegment,
    pub current_turn: Uuid,
    pub current_segment: SegmentKind,
}

/// A participant's view of a battle.
#[derive(Debug, Clone)]
pub struct BattleOverview {
    pub battle: Battle,
    pub topic: Topic,
    pub player1_segments: Vec<SegmentKind>,
    pub player2_segments: Vec<SegmentKind>,
    pub is_your_turn: bool,
}

/// Drives battles through their lifecycle against the persistence port.
pub struct BattleEngine {
    pub(crate) db: Arc<dyn DatabaseService>,
    pub(crate) judge: Arc<dyn DebateJudge>,
    pub(crate) stats: Arc<StatsAggregator>,
    /// One lock per battle id; submissions, joins and judgments all take it.
    pub(crate) locks: KeyedLocks<Uuid>,
    /// One lock per creator, held while their waiting battle is replaced.
    creators: KeyedLocks<Uuid>,
}

impl BattleEngine {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        judge: Arc<dyn DebateJudge>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            db,
            judge,
            stats,
            locks: KeyedLocks::new(),
            creators: KeyedLocks::new(),
        }
    }

    /// Opens a battle, discarding any battle the creator still has waiting.
    pub async fn create_battle(&self, creator_id: Uuid, topic_id: i64, stance: &str) -> ArenaResult<(Battle, Topic)> {
        let topic = self.db.get_topic(topic_id).await?;
        let stance: Stance = stance.trim().parse()?;

        let _guard = self.creators.lock(creator_id).await;
        let battle = Battle::open(topic.id, creator_id, stance, Utc::now());
        let discarded = self.db.open_battle(&battle).await?;
        if discarded > 0 {
            info!(
                "Discarded {} waiting battle(s) previously opened by {}.",
                discarded, creator_id
            );
        }
        info!("Battle {} created by {} on topic {} ({}).", battle.id, creator_id, topic.id, stance);
        Ok((battle, topic))
    }

    pub async fn join_battle(&self, joiner_id: Uuid, battle_id: Uuid) -> ArenaResult<(Battle, Topic)> {
        let _guard = self.locks.lock(battle_id).await;

        let mut battle = self.db.get_battle(battle_id).await?;
        battle.join(joiner_id)?;
        self.db.join_battle(&battle).await?;
        let topic = self.db.get_topic(battle.topic_id).await?;

        info!("Player {} joined battle {}; {} opens.", joiner_id, battle_id, battle.current_turn);
        Ok((battle, topic))
    }

    /// Accepts one segment from the player whose turn it is.
    pub async fn submit_segment(
        &self,
        battle_id: Uuid,
        player_id: Uuid,
        kind: &str,
        transcript: &str,
    ) -> ArenaResult<SubmissionReceipt> {
        let kind = parse_kind(kind)?;
        let draft = SegmentDraft::from_text(kind, transcript)?;

        let _guard = self.locks.lock(battle_id).await;

        let mut battle = self.db.get_battle(battle_id).await?;
        battle.check_submission(player_id, kind)?;

        let segments = self.db.get_battle_segments(battle_id).await?;
        if segments.iter().any(|s| s.player_id == player_id && s.kind == kind) {
            warn!("Player {} tried to resubmit the {} in battle {}.", player_id, kind, battle_id);
            return Err(ArenaError::InvalidState(format!(
                "You have already submitted your {}",
                kind
            )));
        }
        let submitted_of_kind = segments.iter().filter(|s| s.kind == kind).count() + 1;

        let guard = TurnGuard::of(&battle);
        battle.apply_submission(player_id, kind, submitted_of_kind);
        let segment = self
            .db
            .record_battle_turn(&battle, guard, player_id, &draft)
            .await?;

        if battle.current_segment != kind {
            info!(
                "Battle {}: {} complete, advancing to {} with {} to open.",
                battle_id, kind, battle.current_segment, battle.current_turn
            );
        } else {
            info!(
                "Battle {}: {} accepted from {}, turn passes to {}.",
                battle_id, kind, player_id, battle.current_turn
            );
        }

        Ok(SubmissionReceipt {
            segment,
            current_turn: battle.current_turn,
            current_segment: battle.current_segment,
        })
    }

    pub async fn overview(&self, battle_id: Uuid, viewer_id: Uuid) -> ArenaResult<BattleOverview> {
        let battle = self.participant_view(battle_id, viewer_id).await?;
        let segments = self.db.get_battle_segments(battle_id).await?;
        let topic = self.db.get_topic(battle.topic_id).await?;

        let player1_segments = submitted_kinds(&segments, battle.player1_id);
        let player2_segments = battle
            .player2_id
            .map(|p2| submitted_kinds(&segments, p2))
            .unwrap_or_default();
        let is_your_turn = battle.status == BattleStatus::InProgress && battle.current_turn == viewer_id;

        Ok(BattleOverview {
            battle,
            topic,
            player1_segments,
            player2_segments,
            is_your_turn,
        })
    }

    pub async fn segments(&self, battle_id: Uuid, viewer_id: Uuid) -> ArenaResult<Vec<BattleSegment>> {
        self.participant_view(battle_id, viewer_id).await?;
        Ok(self.db.get_battle_segments(battle_id).await?)
    }

    /// Waiting battles the viewer could join.
    pub async fn available(&self, viewer_id: Uuid) -> ArenaResult<Vec<(Battle, Topic)>> {
        let battles = self.db.list_waiting_battles(viewer_id).await?;
        let mut listed = Vec::with_capacity(battles.len());
        for battle in battles {
            let topic = self.db.get_topic(battle.topic_id).await?;
            listed.push((battle, topic));
        }
        Ok(listed)
    }

    async fn participant_view(&self, battle_id: Uuid, viewer_id: Uuid) -> ArenaResult<Battle> {
        let battle = self.db.get_battle(battle_id).await?;
        if !battle.is_participant(viewer_id) {
            return Err(ArenaError::Forbidden(
                "You are not a participant in this battle".to_string(),
            ));
        }
        Ok(battle)
    }
}
