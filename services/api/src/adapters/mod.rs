pub mod db;
pub mod judge;
pub mod llm;
pub mod scorer;
pub mod sst;
pub mod storage;
pub mod topic_gen;

pub use db::DbAdapter;
pub use judge::{LlmJudge, OfflineJudge};
pub use scorer::{LlmScorer, OfflineScorer};
pub use sst::{OfflineTranscriber, WhisperTranscriber};
pub use storage::LocalDiskStorage;
pub use topic_gen::{LlmTopicGenerator, OfflineTopicGenerator};

use debaide_core::ports::{DebateJudge, DebateScorer, SpeechToTextService, TopicGenerator};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AiBackend, Config, SttBackend};
use llm::{build_client, ChatModel};

const SCORING_MAX_TOKENS: u32 = 2000;
const JUDGE_MAX_TOKENS: u32 = 2000;
const TOPIC_MAX_TOKENS: u32 = 500;

/// The AI collaborators chosen at startup.
#[derive(Clone)]
pub struct AiAdapters {
    pub scorer: Arc<dyn DebateScorer>,
    pub judge: Arc<dyn DebateJudge>,
    pub topic_generator: Arc<dyn TopicGenerator>,
    pub transcriber: Arc<dyn SpeechToTextService>,
}

impl AiAdapters {
    /// Every collaborator in its offline variant.
    pub fn offline() -> Self {
        Self {
            scorer: Arc::new(OfflineScorer),
            judge: Arc::new(OfflineJudge),
            topic_generator: Arc::new(OfflineTopicGenerator),
            transcriber: Arc::new(OfflineTranscriber),
        }
    }

    /// Selects each backend from the configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut adapters = Self::offline();

        let chat_client = match config.ai_backend {
            AiBackend::OpenAi => config.openai_api_key.as_deref().map(|key| build_client(key, None)),
            AiBackend::Gemini => config
                .gemini_api_key
                .as_deref()
                .map(|key| build_client(key, Some(&config.gemini_api_base))),
            AiBackend::Offline => None,
        };
        match chat_client {
            Some(client) => {
                info!(
                    "AI backend {:?}: scoring={}, judge={}, topics={}",
                    config.ai_backend, config.scoring_model, config.judge_model, config.topic_model
                );
                adapters.scorer = Arc::new(LlmScorer::new(ChatModel::new(
                    client.clone(),
                    config.scoring_model.clone(),
                    SCORING_MAX_TOKENS,
                )));
                adapters.judge = Arc::new(LlmJudge::new(ChatModel::new(
                    client.clone(),
                    config.judge_model.clone(),
                    JUDGE_MAX_TOKENS,
                )));
                adapters.topic_generator = Arc::new(LlmTopicGenerator::new(ChatModel::new(
                    client,
                    config.topic_model.clone(),
                    TOPIC_MAX_TOKENS,
                )));
            }
            None => warn!("No AI backend configured: fallback scoring and topics, judging unavailable."),
        }

        match (config.stt_backend, config.openai_api_key.as_deref()) {
            (SttBackend::Whisper, Some(key)) => {
                info!("Speech-to-text via {}.", config.stt_model);
                adapters.transcriber = Arc::new(WhisperTranscriber::new(
                    build_client(key, None),
                    config.stt_model.clone(),
                ));
            }
            _ => warn!("No speech-to-text backend configured: uploads get mock transcripts."),
        }

        adapters
    }
}
