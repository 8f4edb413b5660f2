//! services/api/src/bin/seed.rs
//!
//! Seeds the topic catalog with the starter topics when it is empty.

use api_lib::{
    adapters::{DbAdapter, OfflineTopicGenerator},
    config::Config,
    error::ApiError,
};
use debaide_core::TopicCatalog;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    db_adapter.run_migrations().await?;

    // Seeding never generates topics, so the offline generator is enough.
    let catalog = TopicCatalog::new(db_adapter, Arc::new(OfflineTopicGenerator));
    let added = catalog.seed_defaults().await?;
    info!("Seeded {} topic(s).", added);

    Ok(())
}
