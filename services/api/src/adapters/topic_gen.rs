//! services/api/src/adapters/topic_gen.rs
//!
//! Topic-of-the-day generators implementing the `TopicGenerator` port.

use async_trait::async_trait;
use debaide_core::domain::{Difficulty, NewTopic};
use debaide_core::ports::TopicGenerator;
use serde::Deserialize;
use tracing::{info, warn};

use super::llm::{extract_json_object, ChatModel};

const TOPIC_SYSTEM_PROMPT: &str = "You write debate resolutions. Respond with a single JSON object and nothing else.";

const TOPIC_PROMPT: &str = r#"Generate an engaging debate topic for practice. Return a JSON object with:
- title: A clear, specific debate resolution (e.g., "Social media does more harm than good")
- description: 2-3 sentence explanation of the topic's relevance
- difficulty: "easy", "medium", or "hard"
- category: one of "politics", "technology", "ethics", "environment", "education", "health", "economics"

Make it current, relevant, and suitable for practicing argumentation skills."#;

#[derive(Deserialize)]
struct GeneratedTopic {
    title: String,
    description: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Parses a generator reply. Unknown difficulties become `medium`; a blank
/// title or description makes the whole reply unusable.
pub fn parse_topic_reply(reply: &str) -> Option<NewTopic> {
    let generated: GeneratedTopic = serde_json::from_str(extract_json_object(reply)?).ok()?;
    let title = generated.title.trim();
    let description = generated.description.trim();
    if title.is_empty() || description.is_empty() {
        return None;
    }
    let difficulty = generated
        .difficulty
        .and_then(|d| d.parse::<Difficulty>().ok())
        .unwrap_or(Difficulty::Medium);
    let category = generated
        .category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "general".to_string());
    Some(NewTopic::new(title, description, difficulty, &category))
}

#[derive(Clone)]
pub struct LlmTopicGenerator {
    chat: ChatModel,
}

impl LlmTopicGenerator {
    pub fn new(chat: ChatModel) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl TopicGenerator for LlmTopicGenerator {
    async fn generate(&self) -> NewTopic {
        match self.chat.complete(TOPIC_SYSTEM_PROMPT, TOPIC_PROMPT).await {
            Ok(reply) => match parse_topic_reply(&reply) {
                Some(topic) => {
                    info!("Generated topic of the day: {}", topic.title);
                    topic
                }
                None => {
                    warn!("Topic generator reply was unusable, using the fallback topic.");
                    NewTopic::fallback()
                }
            },
            Err(e) => {
                warn!("Topic generation failed, using the fallback topic: {}", e);
                NewTopic::fallback()
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct OfflineTopicGenerator;

#[async_trait]
impl TopicGenerator for OfflineTopicGenerator {
    async fn generate(&self) -> NewTopic {
        NewTopic::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_replies_become_topics() {
        let reply = r#"```json
{"title": "Cities should ban private cars downtown", "description": "Congestion and emissions are rising.", "difficulty": "Hard", "category": "Environment"}
```"#;
        let topic = parse_topic_reply(reply).unwrap();
        assert_eq!(topic.title, "Cities should ban private cars downtown");
        assert_eq!(topic.difficulty, Difficulty::Hard);
        assert_eq!(topic.category, "environment");
    }

    #[test]
    fn odd_difficulties_default_to_medium() {
        let topic = parse_topic_reply(r#"{"title": "T", "description": "D", "difficulty": "brutal"}"#).unwrap();
        assert_eq!(topic.difficulty, Difficulty::Medium);
        assert_eq!(topic.category, "general");
    }

    #[test]
    fn blank_titles_are_unusable() {
        assert!(parse_topic_reply(r#"{"title": " ", "description": "D"}"#).is_none());
        assert!(parse_topic_reply("not json").is_none());
    }

    #[tokio::test]
    async fn offline_generator_hands_out_the_fallback() {
        assert_eq!(OfflineTopicGenerator.generate().await, NewTopic::fallback());
    }
}
