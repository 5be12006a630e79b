use anyhow::Result;
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{AppState, bootstrap_admin, config::ApiConfig, routes};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let config = ApiConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let cache = RedisPool::new(&RedisConfig::from_env()?)?;
    match cache.health_check().await {
        Ok(true) => info!("Redis connection successful"),
        _ => tracing::warn!("Redis is unreachable, feeds will not be cached"),
    }

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(pool, cache, config)?;
    bootstrap_admin(&app_state.admin_repository, &app_state.config).await?;

    // Forget finished rate limit windows every ten minutes
    let limiters = [
        app_state.login_limiter.clone(),
        app_state.otp_limiter.clone(),
        app_state.newsletter_limiter.clone(),
    ];
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        interval.tick().await;
        loop {
            interval.tick().await;
            for limiter in &limiters {
                limiter.prune().await;
            }
        }
    });

    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("API service listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("API service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
