//! services/api/src/adapters/judge.rs
//!
//! Battle judging backends implementing the `DebateJudge` port.

use async_trait::async_trait;
use debaide_core::ports::{DebateJudge, PortError, PortResult};
use tracing::info;

use super::llm::ChatModel;

const JUDGE_SYSTEM_PROMPT: &str =
    "You are an impartial debate judge. Reply with the JSON verdict only, without commentary.";

/// Sends the judging prompt to a chat model and hands back the raw reply.
#[derive(Clone)]
pub struct LlmJudge {
    chat: ChatModel,
}

impl LlmJudge {
    pub fn new(chat: ChatModel) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl DebateJudge for LlmJudge {
    async fn judge(&self, prompt: &str) -> PortResult<String> {
        info!("Sending battle transcript to {} for judging.", self.chat.model());
        self.chat.complete(JUDGE_SYSTEM_PROMPT, prompt).await
    }
}

/// Stands in when no AI backend is configured. Judging has no safe default
/// verdict, so every call fails.
#[derive(Clone, Default)]
pub struct OfflineJudge;

#[async_trait]
impl DebateJudge for OfflineJudge {
    async fn judge(&self, _prompt: &str) -> PortResult<String> {
        Err(PortError::Unexpected("No AI backend is configured for judging".to_string()))
    }
}
