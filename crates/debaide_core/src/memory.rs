//! crates/debaide_core/src/memory.rs
//!
//! An in-process `DatabaseService`. It honours the same uniqueness constraints
//! and guarded updates as the PostgreSQL adapter, so engine behaviour can be
//! exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    Battle, BattleSegment, BattleStatus, NewTopic, PracticeSession, Scorecard, Segment, SegmentDraft,
    SessionStatus, Stance, Topic, User, UserCredentials, UserStats,
};
use crate::ports::{DatabaseService, PortError, PortResult, TurnGuard};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    passwords: HashMap<Uuid, String>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    topics: Vec<Topic>,
    sessions: HashMap<Uuid, PracticeSession>,
    segments: Vec<Segment>,
    scorecards: HashMap<Uuid, Scorecard>,
    battles: HashMap<Uuid, Battle>,
    battle_segments: Vec<BattleSegment>,
    stats: HashMap<Uuid, UserStats>,
    next_row_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_row_id += 1;
        self.next_row_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yields once before taking the store lock, so concurrent callers
    /// interleave between calls the way they do against a real database.
    async fn enter(&self) -> MutexGuard<'_, Inner> {
        tokio::task::yield_now().await;
        self.inner.lock().await
    }

    /// Inserts a topic with an explicit creation time.
    pub async fn insert_topic_at(&self, topic: &NewTopic, created_at: DateTime<Utc>) -> Topic {
        let mut inner = self.enter().await;
        let topic = Topic {
            id: inner.next_id(),
            title: topic.title.clone(),
            description: topic.description.clone(),
            difficulty: topic.difficulty,
            category: topic.category.clone(),
            created_at,
        };
        inner.topics.push(topic.clone());
        topic
    }
}

fn battle_not_found(battle_id: Uuid) -> PortError {
    PortError::NotFound(format!("Battle {} not found", battle_id))
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user(&self, username: &str, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut inner = self.enter().await;
        if inner.users.values().any(|u| u.username == username) {
            return Err(PortError::Conflict("Username already registered".to_string()));
        }
        if inner.users.values().any(|u| u.email == email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        inner.passwords.insert(user.id, hashed_password.to_string());
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let inner = self.enter().await;
        inner
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let inner = self.enter().await;
        let user = inner
            .users
            .values()
            .find(|u| u.username == username)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))?;
        Ok(UserCredentials {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            hashed_password: inner.passwords.get(&user.id).cloned().unwrap_or_default(),
        })
    }

    async fn create_auth_session(&self, token: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> PortResult<()> {
        let mut inner = self.enter().await;
        inner.auth_sessions.insert(token.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        let inner = self.enter().await;
        match inner.auth_sessions.get(token) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, token: &str) -> PortResult<()> {
        let mut inner = self.enter().await;
        inner.auth_sessions.remove(token);
        Ok(())
    }

    async fn list_topics(&self) -> PortResult<Vec<Topic>> {
        let inner = self.enter().await;
        Ok(inner.topics.clone())
    }

    async fn get_topic(&self, topic_id: i64) -> PortResult<Topic> {
        let inner = self.enter().await;
        inner
            .topics
            .iter()
            .find(|t| t.id == topic_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Topic {} not found", topic_id)))
    }

    async fn latest_topic_since(&self, since: DateTime<Utc>) -> PortResult<Option<Topic>> {
        let inner = self.enter().await;
        Ok(inner
            .topics
            .iter()
            .filter(|t| t.created_at >= since)
            .max_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    async fn create_topic(&self, topic: &NewTopic) -> PortResult<Topic> {
        Ok(self.insert_topic_at(topic, Utc::now()).await)
    }

    async fn create_session(&self, topic_id: i64, user_id: Option<Uuid>, stance: Stance) -> PortResult<PracticeSession> {
        let mut inner = self.enter().await;
        let session = PracticeSession {
            id: Uuid::new_v4(),
            topic_id,
            user_id,
            stance,
            status: SessionStatus::InProgress,
            created_at: Utc::now(),
            completed_at: None,
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<PracticeSession> {
        let inner = self.enter().await;
        inner
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn append_segment(&self, session_id: Uuid, draft: &SegmentDraft) -> PortResult<Segment> {
        let mut inner = self.enter().await;
        if !inner.sessions.contains_key(&session_id) {
            return Err(PortError::NotFound(format!("Session {} not found", session_id)));
        }
        if inner
            .segments
            .iter()
            .any(|s| s.session_id == session_id && s.kind == draft.kind)
        {
            return Err(PortError::Conflict(format!(
                "Session already has a {} segment",
                draft.kind
            )));
        }
        let segment = Segment {
            id: inner.next_id(),
            session_id,
            kind: draft.kind,
            transcript: draft.transcript.clone(),
            audio_url: draft.audio_url.clone(),
            duration: draft.duration,
            created_at: Utc::now(),
        };
        inner.segments.push(segment.clone());
        Ok(segment)
    }

    async fn get_segments_for_session(&self, session_id: Uuid) -> PortResult<Vec<Segment>> {
        let inner = self.enter().await;
        Ok(inner
            .segments
            .iter()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn get_scorecard(&self, session_id: Uuid) -> PortResult<Option<Scorecard>> {
        let inner = self.enter().await;
        Ok(inner.scorecards.get(&session_id).cloned())
    }

    async fn complete_session(&self, scorecard: &Scorecard) -> PortResult<()> {
        let mut inner = self.enter().await;
        if inner.scorecards.contains_key(&scorecard.session_id) {
            return Err(PortError::Conflict("Session has already been scored".to_string()));
        }
        let session = inner
            .sessions
            .get_mut(&scorecard.session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", scorecard.session_id)))?;
        session.status = SessionStatus::Completed;
        session.completed_at = Some(scorecard.created_at);
        inner.scorecards.insert(scorecard.session_id, scorecard.clone());
        Ok(())
    }

    async fn open_battle(&self, battle: &Battle) -> PortResult<u64> {
        let mut inner = self.enter().await;
        let before = inner.battles.len();
        inner
            .battles
            .retain(|_, b| !(b.player1_id == battle.player1_id && b.status == BattleStatus::Waiting));
        let discarded = (before - inner.battles.len()) as u64;
        inner.battles.insert(battle.id, battle.clone());
        Ok(discarded)
    }

    async fn get_battle(&self, battle_id: Uuid) -> PortResult<Battle> {
        let inner = self.enter().await;
        inner
            .battles
            .get(&battle_id)
            .cloned()
            .ok_or_else(|| battle_not_found(battle_id))
    }

    async fn list_waiting_battles(&self, excluding: Uuid) -> PortResult<Vec<Battle>> {
        let inner = self.enter().await;
        let mut waiting: Vec<Battle> = inner
            .battles
            .values()
            .filter(|b| b.status == BattleStatus::Waiting && b.player1_id != excluding)
            .cloned()
            .collect();
        waiting.sort_by_key(|b| b.created_at);
        Ok(waiting)
    }

    async fn join_battle(&self, battle: &Battle) -> PortResult<()> {
        let mut inner = self.enter().await;
        let stored = inner
            .battles
            .get_mut(&battle.id)
            .ok_or_else(|| battle_not_found(battle.id))?;
        if stored.status != BattleStatus::Waiting || stored.player2_id.is_some() {
            return Err(PortError::Conflict("Battle is no longer accepting players".to_string()));
        }
        stored.player2_id = battle.player2_id;
        stored.player2_stance = battle.player2_stance;
        stored.status = battle.status;
        Ok(())
    }

    async fn record_battle_turn(
        &self,
        battle: &Battle,
        guard: TurnGuard,
        player_id: Uuid,
        draft: &SegmentDraft,
    ) -> PortResult<BattleSegment> {
        let mut inner = self.enter().await;
        let stored = inner
            .battles
            .get(&battle.id)
            .ok_or_else(|| battle_not_found(battle.id))?;
        if stored.status != BattleStatus::InProgress || TurnGuard::of(stored) != guard {
            return Err(PortError::Conflict("Battle turn changed concurrently".to_string()));
        }
        if inner
            .battle_segments
            .iter()
            .any(|s| s.battle_id == battle.id && s.player_id == player_id && s.kind == draft.kind)
        {
            return Err(PortError::Conflict(format!("Player already submitted the {}", draft.kind)));
        }

        let segment = BattleSegment {
            id: inner.next_id(),
            battle_id: battle.id,
            player_id,
            kind: draft.kind,
            transcript: draft.transcript.clone(),
            audio_url: draft.audio_url.clone(),
            duration: draft.duration,
            created_at: Utc::now(),
        };
        inner.battle_segments.push(segment.clone());
        if let Some(stored) = inner.battles.get_mut(&battle.id) {
            stored.current_turn = battle.current_turn;
            stored.current_segment = battle.current_segment;
        }
        Ok(segment)
    }

    async fn get_battle_segments(&self, battle_id: Uuid) -> PortResult<Vec<BattleSegment>> {
        let inner = self.enter().await;
        Ok(inner
            .battle_segments
            .iter()
            .filter(|s| s.battle_id == battle_id)
            .cloned()
            .collect())
    }

    async fn finalize_battle(&self, battle: &Battle) -> PortResult<()> {
        let mut inner = self.enter().await;
        let stored = inner
            .battles
            .get_mut(&battle.id)
            .ok_or_else(|| battle_not_found(battle.id))?;
        if stored.status != BattleStatus::InProgress {
            return Err(PortError::Conflict("Battle is no longer in progress".to_string()));
        }
        stored.status = battle.status;
        stored.winner_id = battle.winner_id;
        stored.judgment = battle.judgment.clone();
        stored.completed_at = battle.completed_at;
        Ok(())
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<Option<UserStats>> {
        let inner = self.enter().await;
        Ok(inner.stats.get(&user_id).cloned())
    }

    async fn ensure_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let mut inner = self.enter().await;
        let stats = inner
            .stats
            .entry(user_id)
            .or_insert_with(|| UserStats::new(user_id, Utc::now()));
        Ok(stats.clone())
    }

    async fn update_user_stats(
        &self,
        user_id: Uuid,
        update: &(dyn for<'s> Fn(&'s mut UserStats) + Send + Sync),
    ) -> PortResult<UserStats> {
        let mut inner = self.enter().await;
        let stats = inner
            .stats
            .entry(user_id)
            .or_insert_with(|| UserStats::new(user_id, Utc::now()));
        update(stats);
        Ok(stats.clone())
    }
}
