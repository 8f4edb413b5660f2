//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use debaide_core::domain::{
    Battle, BattleSegment, Feedback, Highlight, NewTopic, PracticeSession, ScoreBreakdown, Scorecard, Segment,
    SegmentDraft, Stance, Topic, User, UserCredentials, UserStats,
};
use debaide_core::error::ArenaError;
use debaide_core::ports::{DatabaseService, PortError, PortResult, TurnGuard};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Error Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps constraint violations on insert to their port meaning.
fn insert_error(e: sqlx::Error, conflict: &str, missing: &str) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return PortError::Conflict(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return PortError::NotFound(missing.to_string());
        }
    }
    unexpected(e)
}

fn decode<T: FromStr<Err = ArenaError>>(raw: &str) -> PortResult<T> {
    raw.parse::<T>()
        .map_err(|e| PortError::Unexpected(format!("Corrupt stored value: {}", e)))
}

fn count(n: i32) -> u32 {
    u32::try_from(n).unwrap_or(0)
}

fn column(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct TopicRecord {
    id: i64,
    title: String,
    description: String,
    difficulty: String,
    category: String,
    created_at: DateTime<Utc>,
}
impl TopicRecord {
    fn to_domain(self) -> PortResult<Topic> {
        Ok(Topic {
            id: self.id,
            title: self.title,
            description: self.description,
            difficulty: decode(&self.difficulty)?,
            category: self.category,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    topic_id: i64,
    user_id: Option<Uuid>,
    stance: String,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<PracticeSession> {
        Ok(PracticeSession {
            id: self.id,
            topic_id: self.topic_id,
            user_id: self.user_id,
            stance: decode(&self.stance)?,
            status: decode(&self.status)?,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(FromRow)]
struct SegmentRecord {
    id: i64,
    session_id: Uuid,
    kind: String,
    transcript: String,
    audio_url: Option<String>,
    duration: f64,
    created_at: DateTime<Utc>,
}
impl SegmentRecord {
    fn to_domain(self) -> PortResult<Segment> {
        Ok(Segment {
            id: self.id,
            session_id: self.session_id,
            kind: decode(&self.kind)?,
            transcript: self.transcript,
            audio_url: self.audio_url,
            duration: self.duration,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ScorecardRecord {
    session_id: Uuid,
    structure_score: f64,
    logic_score: f64,
    delivery_score: f64,
    time_use_score: f64,
    total_score: f64,
    feedback: Json<Feedback>,
    highlights: Json<Vec<Highlight>>,
    drills: Json<Vec<Value>>,
    created_at: DateTime<Utc>,
}
impl ScorecardRecord {
    fn to_domain(self) -> Scorecard {
        Scorecard {
            session_id: self.session_id,
            scores: ScoreBreakdown {
                structure: self.structure_score,
                logic: self.logic_score,
                delivery: self.delivery_score,
                time_use: self.time_use_score,
                total: self.total_score,
            },
            feedback: self.feedback.0,
            highlights: self.highlights.0,
            drills: self.drills.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct BattleRecord {
    id: Uuid,
    topic_id: i64,
    player1_id: Uuid,
    player2_id: Option<Uuid>,
    player1_stance: String,
    player2_stance: Option<String>,
    status: String,
    current_turn: Uuid,
    current_segment: String,
    winner_id: Option<Uuid>,
    judgment: Option<Value>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}
impl BattleRecord {
    fn to_domain(self) -> PortResult<Battle> {
        let player2_stance = match self.player2_stance {
            Some(raw) => Some(decode::<Stance>(&raw)?),
            None => None,
        };
        Ok(Battle {
            id: self.id,
            topic_id: self.topic_id,
            player1_id: self.player1_id,
            player2_id: self.player2_id,
            player1_stance: decode(&self.player1_stance)?,
            player2_stance,
            status: decode(&self.status)?,
            current_turn: self.current_turn,
            current_segment: decode(&self.current_segment)?,
            winner_id: self.winner_id,
            judgment: self.judgment,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(FromRow)]
struct BattleSegmentRecord {
    id: i64,
    battle_id: Uuid,
    player_id: Uuid,
    kind: String,
    transcript: String,
    audio_url: Option<String>,
    duration: f64,
    created_at: DateTime<Utc>,
}
impl BattleSegmentRecord {
    fn to_domain(self) -> PortResult<BattleSegment> {
        Ok(BattleSegment {
            id: self.id,
            battle_id: self.battle_id,
            player_id: self.player_id,
            kind: decode(&self.kind)?,
            transcript: self.transcript,
            audio_url: self.audio_url,
            duration: self.duration,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserStatsRecord {
    user_id: Uuid,
    total_practice_sessions: i32,
    completed_practice_sessions: i32,
    average_practice_score: f64,
    avg_structure_score: f64,
    avg_logic_score: f64,
    avg_delivery_score: f64,
    avg_time_use_score: f64,
    total_battles: i32,
    battles_won: i32,
    battles_lost: i32,
    current_win_streak: i32,
    best_win_streak: i32,
    total_debate_time: f64,
    last_activity: DateTime<Utc>,
    favorite_stance: Option<String>,
    topics_debated: Json<BTreeMap<i64, u32>>,
}
impl UserStatsRecord {
    fn to_domain(self) -> PortResult<UserStats> {
        let favorite_stance = match self.favorite_stance {
            Some(raw) => Some(decode::<Stance>(&raw)?),
            None => None,
        };
        Ok(UserStats {
            user_id: self.user_id,
            total_practice_sessions: count(self.total_practice_sessions),
            completed_practice_sessions: count(self.completed_practice_sessions),
            average_practice_score: self.average_practice_score,
            avg_structure_score: self.avg_structure_score,
            avg_logic_score: self.avg_logic_score,
            avg_delivery_score: self.avg_delivery_score,
            avg_time_use_score: self.avg_time_use_score,
            total_battles: count(self.total_battles),
            battles_won: count(self.battles_won),
            battles_lost: count(self.battles_lost),
            current_win_streak: count(self.current_win_streak),
            best_win_streak: count(self.best_win_streak),
            total_debate_time: self.total_debate_time,
            last_activity: self.last_activity,
            favorite_stance,
            topics_debated: self.topics_debated.0,
        })
    }
}

const STATS_COLUMNS: &str = "user_id, total_practice_sessions, completed_practice_sessions, average_practice_score, \
     avg_structure_score, avg_logic_score, avg_delivery_score, avg_time_use_score, total_battles, battles_won, \
     battles_lost, current_win_streak, best_win_streak, total_debate_time, last_activity, favorite_stance, \
     topics_debated";

const BATTLE_COLUMNS: &str = "id, topic_id, player1_id, player2_id, player1_stance, player2_stance, status, \
     current_turn, current_segment, winner_id, judgment, created_at, completed_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users & Auth ---
    async fn create_user(&self, username: &str, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, email, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING id, username, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, "Username or email already registered", "User"))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>("SELECT id, username, email, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, email, hashed_password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CredentialsRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn create_auth_session(&self, token: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM auth_sessions WHERE token = $1 AND expires_at > NOW()")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Topic Catalog ---
    async fn list_topics(&self) -> PortResult<Vec<Topic>> {
        sqlx::query_as::<_, TopicRecord>(
            "SELECT id, title, description, difficulty, category, created_at FROM topics ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(TopicRecord::to_domain)
        .collect()
    }

    async fn get_topic(&self, topic_id: i64) -> PortResult<Topic> {
        sqlx::query_as::<_, TopicRecord>(
            "SELECT id, title, description, difficulty, category, created_at FROM topics WHERE id = $1",
        )
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Topic {} not found", topic_id)))?
        .to_domain()
    }

    async fn latest_topic_since(&self, since: DateTime<Utc>) -> PortResult<Option<Topic>> {
        sqlx::query_as::<_, TopicRecord>(
            "SELECT id, title, description, difficulty, category, created_at FROM topics \
             WHERE created_at >= $1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(TopicRecord::to_domain)
        .transpose()
    }

    async fn create_topic(&self, topic: &NewTopic) -> PortResult<Topic> {
        sqlx::query_as::<_, TopicRecord>(
            "INSERT INTO topics (title, description, difficulty, category) VALUES ($1, $2, $3, $4) \
             RETURNING id, title, description, difficulty, category, created_at",
        )
        .bind(&topic.title)
        .bind(&topic.description)
        .bind(topic.difficulty.as_str())
        .bind(&topic.category)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    // --- Practice Sessions ---
    async fn create_session(&self, topic_id: i64, user_id: Option<Uuid>, stance: Stance) -> PortResult<PracticeSession> {
        sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO sessions (id, topic_id, user_id, stance) VALUES ($1, $2, $3, $4) \
             RETURNING id, topic_id, user_id, stance, status, created_at, completed_at",
        )
        .bind(Uuid::new_v4())
        .bind(topic_id)
        .bind(user_id)
        .bind(stance.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, "Session already exists", "Topic or user not found"))?
        .to_domain()
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<PracticeSession> {
        sqlx::query_as::<_, SessionRecord>(
            "SELECT id, topic_id, user_id, stance, status, created_at, completed_at FROM sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?
        .to_domain()
    }

    async fn append_segment(&self, session_id: Uuid, draft: &SegmentDraft) -> PortResult<Segment> {
        sqlx::query_as::<_, SegmentRecord>(
            "INSERT INTO segments (session_id, kind, transcript, audio_url, duration) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, session_id, kind, transcript, audio_url, duration, created_at",
        )
        .bind(session_id)
        .bind(draft.kind.as_str())
        .bind(&draft.transcript)
        .bind(&draft.audio_url)
        .bind(draft.duration)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            insert_error(
                e,
                &format!("Session already has a {} segment", draft.kind),
                &format!("Session {} not found", session_id),
            )
        })?
        .to_domain()
    }

    async fn get_segments_for_session(&self, session_id: Uuid) -> PortResult<Vec<Segment>> {
        sqlx::query_as::<_, SegmentRecord>(
            "SELECT id, session_id, kind, transcript, audio_url, duration, created_at FROM segments \
             WHERE session_id = $1 ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(SegmentRecord::to_domain)
        .collect()
    }

    async fn get_scorecard(&self, session_id: Uuid) -> PortResult<Option<Scorecard>> {
        let record = sqlx::query_as::<_, ScorecardRecord>(
            "SELECT session_id, structure_score, logic_score, delivery_score, time_use_score, total_score, \
             feedback, highlights, drills, created_at FROM scorecards WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ScorecardRecord::to_domain))
    }

    async fn complete_session(&self, scorecard: &Scorecard) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO scorecards (session_id, structure_score, logic_score, delivery_score, time_use_score, \
             total_score, feedback, highlights, drills, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(scorecard.session_id)
        .bind(scorecard.scores.structure)
        .bind(scorecard.scores.logic)
        .bind(scorecard.scores.delivery)
        .bind(scorecard.scores.time_use)
        .bind(scorecard.scores.total)
        .bind(Json(&scorecard.feedback))
        .bind(Json(&scorecard.highlights))
        .bind(Json(&scorecard.drills))
        .bind(scorecard.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            insert_error(
                e,
                "Session has already been scored",
                &format!("Session {} not found", scorecard.session_id),
            )
        })?;

        sqlx::query("UPDATE sessions SET status = 'completed', completed_at = $2 WHERE id = $1")
            .bind(scorecard.session_id)
            .bind(scorecard.created_at)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)
    }

    // --- Battles ---
    async fn open_battle(&self, battle: &Battle) -> PortResult<u64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let discarded = sqlx::query("DELETE FROM battles WHERE player1_id = $1 AND status = 'waiting'")
            .bind(battle.player1_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .rows_affected();

        sqlx::query(
            "INSERT INTO battles (id, topic_id, player1_id, player1_stance, status, current_turn, current_segment, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(battle.id)
        .bind(battle.topic_id)
        .bind(battle.player1_id)
        .bind(battle.player1_stance.as_str())
        .bind(battle.status.as_str())
        .bind(battle.current_turn)
        .bind(battle.current_segment.as_str())
        .bind(battle.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            insert_error(
                e,
                "You already have a battle waiting for an opponent",
                "Topic or player not found",
            )
        })?;

        tx.commit().await.map_err(unexpected)?;
        Ok(discarded)
    }

    async fn get_battle(&self, battle_id: Uuid) -> PortResult<Battle> {
        sqlx::query_as::<_, BattleRecord>(&format!("SELECT {} FROM battles WHERE id = $1", BATTLE_COLUMNS))
            .bind(battle_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Battle {} not found", battle_id)))?
            .to_domain()
    }

    async fn list_waiting_battles(&self, excluding: Uuid) -> PortResult<Vec<Battle>> {
        sqlx::query_as::<_, BattleRecord>(&format!(
            "SELECT {} FROM battles WHERE status = 'waiting' AND player1_id <> $1 ORDER BY created_at",
            BATTLE_COLUMNS
        ))
        .bind(excluding)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(BattleRecord::to_domain)
        .collect()
    }

    async fn join_battle(&self, battle: &Battle) -> PortResult<()> {
        let updated = sqlx::query(
            "UPDATE battles SET player2_id = $2, player2_stance = $3, status = $4 \
             WHERE id = $1 AND status = 'waiting' AND player2_id IS NULL",
        )
        .bind(battle.id)
        .bind(battle.player2_id)
        .bind(battle.player2_stance.map(|s| s.as_str()))
        .bind(battle.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "Battle is no longer accepting players", "Player not found"))?
        .rows_affected();

        if updated == 0 {
            return Err(PortError::Conflict("Battle is no longer accepting players".to_string()));
        }
        Ok(())
    }

    async fn record_battle_turn(
        &self,
        battle: &Battle,
        guard: TurnGuard,
        player_id: Uuid,
        draft: &SegmentDraft,
    ) -> PortResult<BattleSegment> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Dropping the transaction on an early return rolls it back.
        let updated = sqlx::query(
            "UPDATE battles SET current_turn = $2, current_segment = $3 \
             WHERE id = $1 AND status = 'in_progress' AND current_turn = $4 AND current_segment = $5",
        )
        .bind(battle.id)
        .bind(battle.current_turn)
        .bind(battle.current_segment.as_str())
        .bind(guard.current_turn)
        .bind(guard.current_segment.as_str())
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?
        .rows_affected();
        if updated == 0 {
            return Err(PortError::Conflict("Battle turn changed concurrently".to_string()));
        }

        let record = sqlx::query_as::<_, BattleSegmentRecord>(
            "INSERT INTO battle_segments (battle_id, player_id, kind, transcript, audio_url, duration) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, battle_id, player_id, kind, transcript, audio_url, duration, created_at",
        )
        .bind(battle.id)
        .bind(player_id)
        .bind(draft.kind.as_str())
        .bind(&draft.transcript)
        .bind(&draft.audio_url)
        .bind(draft.duration)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            insert_error(
                e,
                &format!("Player already submitted the {}", draft.kind),
                &format!("Battle {} not found", battle.id),
            )
        })?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_battle_segments(&self, battle_id: Uuid) -> PortResult<Vec<BattleSegment>> {
        sqlx::query_as::<_, BattleSegmentRecord>(
            "SELECT id, battle_id, player_id, kind, transcript, audio_url, duration, created_at \
             FROM battle_segments WHERE battle_id = $1 ORDER BY id",
        )
        .bind(battle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(BattleSegmentRecord::to_domain)
        .collect()
    }

    async fn finalize_battle(&self, battle: &Battle) -> PortResult<()> {
        let updated = sqlx::query(
            "UPDATE battles SET status = $2, winner_id = $3, judgment = $4, completed_at = $5 \
             WHERE id = $1 AND status = 'in_progress'",
        )
        .bind(battle.id)
        .bind(battle.status.as_str())
        .bind(battle.winner_id)
        .bind(&battle.judgment)
        .bind(battle.completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?
        .rows_affected();

        if updated == 0 {
            return Err(PortError::Conflict("Battle is no longer in progress".to_string()));
        }
        Ok(())
    }

    // --- Statistics ---
    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<Option<UserStats>> {
        sqlx::query_as::<_, UserStatsRecord>(&format!("SELECT {} FROM user_stats WHERE user_id = $1", STATS_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserStatsRecord::to_domain)
            .transpose()
    }

    async fn ensure_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        sqlx::query("INSERT INTO user_stats (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(e, "Stats already exist", &format!("User {} not found", user_id)))?;

        self.get_user_stats(user_id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Stats for user {} not found", user_id)))
    }

    async fn update_user_stats(
        &self,
        user_id: Uuid,
        update: &(dyn for<'s> Fn(&'s mut UserStats) + Send + Sync),
    ) -> PortResult<UserStats> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("INSERT INTO user_stats (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_error(e, "Stats already exist", &format!("User {} not found", user_id)))?;

        let mut stats = sqlx::query_as::<_, UserStatsRecord>(&format!(
            "SELECT {} FROM user_stats WHERE user_id = $1 FOR UPDATE",
            STATS_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain()?;

        update(&mut stats);

        sqlx::query(
            "UPDATE user_stats SET total_practice_sessions = $2, completed_practice_sessions = $3, \
             average_practice_score = $4, avg_structure_score = $5, avg_logic_score = $6, avg_delivery_score = $7, \
             avg_time_use_score = $8, total_battles = $9, battles_won = $10, battles_lost = $11, \
             current_win_streak = $12, best_win_streak = $13, total_debate_time = $14, last_activity = $15, \
             favorite_stance = $16, topics_debated = $17 WHERE user_id = $1",
        )
        .bind(stats.user_id)
        .bind(column(stats.total_practice_sessions))
        .bind(column(stats.completed_practice_sessions))
        .bind(stats.average_practice_score)
        .bind(stats.avg_structure_score)
        .bind(stats.avg_logic_score)
        .bind(stats.avg_delivery_score)
        .bind(stats.avg_time_use_score)
        .bind(column(stats.total_battles))
        .bind(column(stats.battles_won))
        .bind(column(stats.battles_lost))
        .bind(column(stats.current_win_streak))
        .bind(column(stats.best_win_streak))
        .bind(stats.total_debate_time)
        .bind(stats.last_activity)
        .bind(stats.favorite_stance.map(|s| s.as_str()))
        .bind(Json(&stats.topics_debated))
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(stats)
    }
}
