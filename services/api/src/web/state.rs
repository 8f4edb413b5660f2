//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::AiAdapters;
use crate::config::Config;
use debaide_core::ports::{DatabaseService, SpeechToTextService, StorageService};
use debaide_core::{BattleEngine, PracticePipeline, StatsAggregator, TopicCatalog};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub catalog: Arc<TopicCatalog>,
    pub practice: Arc<PracticePipeline>,
    pub battles: Arc<BattleEngine>,
    pub stats: Arc<StatsAggregator>,
    pub transcriber: Arc<dyn SpeechToTextService>,
}

impl AppState {
    /// Wires the core engines to the chosen adapters. Every engine shares one
    /// `StatsAggregator` so its per-user locks cover practice and battles alike.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        config: Arc<Config>,
        ai: AiAdapters,
        storage: Arc<dyn StorageService>,
    ) -> Self {
        let stats = Arc::new(StatsAggregator::new(db.clone()));
        let catalog = Arc::new(TopicCatalog::new(db.clone(), ai.topic_generator));
        let practice = Arc::new(PracticePipeline::new(
            db.clone(),
            ai.scorer,
            storage,
            ai.transcriber.clone(),
            stats.clone(),
        ));
        let battles = Arc::new(BattleEngine::new(db.clone(), ai.judge, stats.clone()));

        Self {
            db,
            config,
            catalog,
            practice,
            battles,
            stats,
            transcriber: ai.transcriber,
        }
    }
}
