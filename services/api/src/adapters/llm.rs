//! services/api/src/adapters/llm.rs
//!
//! Shared plumbing for every adapter that talks to an OpenAI-compatible chat
//! endpoint (OpenAI itself, or Gemini through its compatibility layer).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use debaide_core::judging::strip_code_fences;
use debaide_core::ports::{PortError, PortResult};
use regex::Regex;

/// Builds a client for the given key, pointing at `api_base` when one is set.
pub fn build_client(api_key: &str, api_base: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }
    Client::with_config(config)
}

/// One model on one endpoint, asked single-shot questions.
#[derive(Clone)]
pub struct ChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
}

impl ChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: String, max_tokens: u32) -> Self {
        Self { client, model, max_tokens }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a system + user message pair and returns the first choice's text.
    pub async fn complete(&self, system: &str, user: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: system.into(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: user.into(),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(self.max_tokens)
            .messages(messages)
            .build()
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| PortError::Unexpected(format!("{} returned no text content", self.model)))
    }
}

/// Pulls the outermost `{...}` object out of a model reply, ignoring code
/// fences and any chatter around it.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let body = strip_code_fences(reply);
    let object = Regex::new(r"(?s)\{.*\}").ok()?;
    object.find(body).map(|m| m.as_str())
}
