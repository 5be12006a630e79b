use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod scheduler;

use api::{
    clients::http_client,
    config::ApiConfig,
    feeds::{FeedService, StaticFeeds},
    repositories::{AdminRepository, OtpRepository},
};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, init_pool},
};
use scheduler::{Maintenance, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting maintenance worker");

    let api_config = Arc::new(ApiConfig::from_env()?);
    let worker_config = WorkerConfig::from_env();

    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    let cache = RedisPool::new(&RedisConfig::from_env()?)?;

    let feeds = FeedService::new(
        http_client(api_config.http_timeout_secs)?,
        cache,
        api_config,
        StaticFeeds::load()?,
    );
    let maintenance = Maintenance::new(
        AdminRepository::new(pool.clone()),
        OtpRepository::new(pool),
        feeds,
    );

    let mut scheduler = maintenance.start(&worker_config).await?;

    // Keep the worker running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down maintenance worker");
    scheduler.shutdown().await?;

    Ok(())
}
