//! crates/debaide_core/src/stats.rs
//!
//! Incremental skill statistics. Practice completions feed the running skill
//! averages; battle completions feed only the win/loss counters and streaks.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Battle, BattleSegment, ScoreBreakdown, Scorecard, Segment, UserStats};
use crate::error::ArenaResult;
use crate::locks::KeyedLocks;
use crate::ports::DatabaseService;

/// `(old * (n - 1) + value) / n`, where `n` already counts `value`.
fn running_mean(old: f64, value: f64, n: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = f64::from(n);
    (old * (n - 1.0) + value) / n
}

impl UserStats {
    /// An empty record, as created on first need.
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_practice_sessions: 0,
            completed_practice_sessions: 0,
            average_practice_score: 0.0,
            avg_structure_score: 0.0,
            avg_logic_score: 0.0,
            avg_delivery_score: 0.0,
            avg_time_use_score: 0.0,
            total_battles: 0,
            battles_won: 0,
            battles_lost: 0,
            current_win_streak: 0,
            best_win_streak: 0,
            total_debate_time: 0.0,
            last_activity: now,
            favorite_stance: None,
            topics_debated: BTreeMap::new(),
        }
    }

    /// Folds one completed practice session into the running averages.
    pub fn record_practice(
        &mut self,
        scores: &ScoreBreakdown,
        debate_seconds: f64,
        topic_id: i64,
        at: DateTime<Utc>,
    ) {
        self.total_practice_sessions += 1;
        self.completed_practice_sessions += 1;
        let n = self.completed_practice_sessions;

        self.average_practice_score = running_mean(self.average_practice_score, scores.total, n);
        self.avg_structure_score = running_mean(self.avg_structure_score, scores.structure, n);
        self.avg_logic_score = running_mean(self.avg_logic_score, scores.logic, n);
        self.avg_delivery_score = running_mean(self.avg_delivery_score, scores.delivery, n);
        self.avg_time_use_score = running_mean(self.avg_time_use_score, scores.time_use, n);

        self.add_debate(debate_seconds, topic_id, at);
    }

    /// Records one battle outcome. Skill averages are left alone.
    pub fn record_battle(&mut self, won: bool, debate_seconds: f64, topic_id: i64, at: DateTime<Utc>) {
        self.total_battles += 1;
        if won {
            self.battles_won += 1;
            self.current_win_streak += 1;
            self.best_win_streak = self.best_win_streak.max(self.current_win_streak);
        } else {
            self.battles_lost += 1;
            self.current_win_streak = 0;
        }
        self.add_debate(debate_seconds, topic_id, at);
    }

    /// Percentage of battles won, 0 when none were played.
    pub fn win_rate(&self) -> f64 {
        if self.total_battles == 0 {
            0.0
        } else {
            f64::from(self.battles_won) / f64::from(self.total_battles) * 100.0
        }
    }

    fn add_debate(&mut self, debate_seconds: f64, topic_id: i64, at: DateTime<Utc>) {
        if debate_seconds.is_finite() && debate_seconds > 0.0 {
            self.total_debate_time += debate_seconds;
        }
        *self.topics_debated.entry(topic_id).or_insert(0) += 1;
        self.last_activity = at;
    }
}

/// Applies stats updates with a per-user lock around each read-modify-write.
/// The store applies each update atomically as well, which covers writers in
/// other processes.
pub struct StatsAggregator {
    db: Arc<dyn DatabaseService>,
    locks: KeyedLocks<Uuid>,
}

impl StatsAggregator {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self {
            db,
            locks: KeyedLocks::new(),
        }
    }

    /// The stored record, or a fresh one if the user has none yet.
    pub async fn fetch_or_create(&self, user_id: Uuid) -> ArenaResult<UserStats> {
        match self.db.get_user_stats(user_id).await? {
            Some(stats) => Ok(stats),
            None => Ok(self.db.ensure_user_stats(user_id).await?),
        }
    }

    pub async fn record_practice(
        &self,
        user_id: Uuid,
        scorecard: &Scorecard,
        segments: &[Segment],
        topic_id: i64,
    ) -> ArenaResult<UserStats> {
        let _guard = self.locks.lock(user_id).await;

        let seconds: f64 = segments.iter().map(|s| s.duration).sum();
        let now = Utc::now();
        let stats = self
            .db
            .update_user_stats(user_id, &|stats: &mut UserStats| {
                stats.record_practice(&scorecard.scores, seconds, topic_id, now)
            })
            .await?;

        info!(
            "Stats for {}: {} practice sessions, average {:.2}.",
            user_id, stats.completed_practice_sessions, stats.average_practice_score
        );
        Ok(stats)
    }

    /// Updates both participants of a completed battle, one user lock at a time.
    pub async fn record_battle(&self, battle: &Battle, segments: &[BattleSegment]) -> ArenaResult<()> {
        let Some(winner_id) = battle.winner_id else {
            warn!("Battle {} has no winner; stats left unchanged.", battle.id);
            return Ok(());
        };

        for player_id in [Some(battle.player1_id), battle.player2_id].into_iter().flatten() {
            let _guard = self.locks.lock(player_id).await;

            let seconds: f64 = segments
                .iter()
                .filter(|s| s.player_id == player_id)
                .map(|s| s.duration)
                .sum();
            let won = player_id == winner_id;
            let now = Utc::now();
            let stats = self
                .db
                .update_user_stats(player_id, &|stats: &mut UserStats| {
                    stats.record_battle(won, seconds, battle.topic_id, now)
                })
                .await?;

            info!(
                "Stats for {}: battle {} {}, streak {} (best {}).",
                player_id,
                battle.id,
                if won { "won" } else { "lost" },
                stats.current_win_streak,
                stats.best_win_streak
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(total: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            structure: total / 4.0,
            logic: total / 4.0,
            delivery: total / 4.0,
            time_use: total / 4.0,
            total,
        }
    }

    #[test]
    fn running_average_matches_the_plain_mean() {
        let mut stats = UserStats::new(Uuid::new_v4(), Utc::now());
        for total in [10.0, 14.0, 18.0] {
            stats.record_practice(&scores(total), 60.0, 3, Utc::now());
        }
        assert_eq!(stats.average_practice_score, 14.0);
        assert_eq!(stats.avg_structure_score, 3.5);
        assert_eq!(stats.completed_practice_sessions, 3);
        assert_eq!(stats.total_practice_sessions, 3);
        assert_eq!(stats.total_debate_time, 180.0);
        assert_eq!(stats.topics_debated.get(&3), Some(&3));
    }

    #[test]
    fn best_streak_is_the_longest_unbroken_run() {
        let mut stats = UserStats::new(Uuid::new_v4(), Utc::now());
        for won in [true, false, true, true] {
            stats.record_battle(won, 0.0, 1, Utc::now());
        }
        assert_eq!(stats.current_win_streak, 2);
        assert_eq!(stats.best_win_streak, 2);
        assert_eq!(stats.battles_won, 3);
        assert_eq!(stats.battles_lost, 1);
        assert_eq!(stats.win_rate(), 75.0);
    }

    #[test]
    fn battles_do_not_touch_skill_averages() {
        let mut stats = UserStats::new(Uuid::new_v4(), Utc::now());
        stats.record_practice(&scores(16.0), 0.0, 1, Utc::now());
        let before = (stats.average_practice_score, stats.avg_logic_score);
        stats.record_battle(true, 90.0, 2, Utc::now());
        assert_eq!((stats.average_practice_score, stats.avg_logic_score), before);
        assert_eq!(stats.completed_practice_sessions, 1);
    }

    #[test]
    fn win_rate_is_zero_without_battles() {
        let stats = UserStats::new(Uuid::new_v4(), Utc::now());
        assert_eq!(stats.win_rate(), 0.0);
    }
}
