//! crates/debaide_core/src/catalog.rs
//!
//! The topic catalog: curated starter topics plus one generated topic per UTC day.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::domain::{Difficulty, NewTopic, Topic};
use crate::error::ArenaResult;
use crate::ports::{DatabaseService, TopicGenerator};

/// The curated topics a fresh catalog is seeded with.
pub fn starter_topics() -> Vec<NewTopic> {
    vec![
        NewTopic::new(
            "Social media does more harm than good",
            "Examine the impact of social media on mental health, democracy, and social connections.",
            Difficulty::Medium,
            "technology",
        ),
        NewTopic::new(
            "Remote work should be the default for office jobs",
            "Debate the future of work considering productivity, work-life balance, and company culture.",
            Difficulty::Easy,
            "economics",
        ),
        NewTopic::new(
            "Artificial intelligence poses an existential threat to humanity",
            "Discuss AI safety, regulation, and the long-term implications of advanced AI systems.",
            Difficulty::Hard,
            "technology",
        ),
        NewTopic::new(
            "College education should be free for all citizens",
            "Explore the economic impact, accessibility, and value of higher education.",
            Difficulty::Medium,
            "education",
        ),
        NewTopic::new(
            "Climate change is primarily caused by human activity",
            "Evaluate scientific evidence and debate policy responses to environmental challenges.",
            Difficulty::Medium,
            "environment",
        ),
        NewTopic::new(
            "Universal basic income would benefit society",
            "Analyze the economic feasibility and social impact of guaranteed income programs.",
            Difficulty::Hard,
            "economics",
        ),
        NewTopic::new(
            "Video games contribute to violent behavior",
            "Examine research on gaming's psychological effects and media influence on behavior.",
            Difficulty::Easy,
            "ethics",
        ),
        NewTopic::new(
            "Privacy is more important than security",
            "Debate the balance between civil liberties and safety in the digital age.",
            Difficulty::Medium,
            "politics",
        ),
        NewTopic::new(
            "Nuclear energy is essential for fighting climate change",
            "Weigh the benefits and risks of nuclear power as a clean energy source.",
            Difficulty::Hard,
            "environment",
        ),
        NewTopic::new(
            "Standardized testing accurately measures student ability",
            "Evaluate testing methods and their role in education assessment and college admissions.",
            Difficulty::Easy,
            "education",
        ),
    ]
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

pub struct TopicCatalog {
    db: Arc<dyn DatabaseService>,
    generator: Arc<dyn TopicGenerator>,
}

impl TopicCatalog {
    pub fn new(db: Arc<dyn DatabaseService>, generator: Arc<dyn TopicGenerator>) -> Self {
        Self { db, generator }
    }

    pub async fn list_topics(&self) -> ArenaResult<Vec<Topic>> {
        Ok(self.db.list_topics().await?)
    }

    pub async fn get_topic(&self, topic_id: i64) -> ArenaResult<Topic> {
        Ok(self.db.get_topic(topic_id).await?)
    }

    /// The newest topic created today, generating and storing one if there is none.
    /// Two first calls racing may both generate; the later one wins from then on.
    pub async fn daily_topic(&self) -> ArenaResult<Topic> {
        let since = start_of_day(Utc::now());
        if let Some(topic) = self.db.latest_topic_since(since).await? {
            return Ok(topic);
        }

        let generated = self.generator.generate().await;
        let topic = self.db.create_topic(&generated).await?;
        info!("Generated daily topic {}: {}", topic.id, topic.title);
        Ok(topic)
    }

    /// Inserts the starter topics into an empty catalog. Returns how many were added.
    pub async fn seed_defaults(&self) -> ArenaResult<usize> {
        let existing = self.db.list_topics().await?;
        if !existing.is_empty() {
            info!("Catalog already has {} topics, skipping seed.", existing.len());
            return Ok(0);
        }

        let topics = starter_topics();
        for topic in &topics {
            self.db.create_topic(topic).await?;
        }
        info!("Seeded {} debate topics.", topics.len());
        Ok(topics.len())
    }
}
