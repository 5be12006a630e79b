//! Integration tests for the infrastructure components
//!
//! These tests need a running PostgreSQL and Redis (see `DATABASE_URL` and
//! `REDIS_URL`) and are ignored by default:
//! `cargo test -p common -- --ignored`

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
};
use serde::{Deserialize, Serialize};
use sqlx::Row;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    items: Vec<String>,
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_database_migrations_and_tables() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;
    // Applying twice is a no-op
    run_migrations(&pool).await?;

    let row = sqlx::query(
        "SELECT COUNT(*) AS tables FROM information_schema.tables
         WHERE table_name IN ('admin_users', 'admin_sessions', 'platform_stats', 'challenges',
                              'members', 'otp_verifications', 'newsletter_subscribers',
                              'admin_logs', 'unauthorized_access_logs')",
    )
    .fetch_one(&pool)
    .await?;

    let tables: i64 = row.get("tables");
    assert_eq!(tables, 9, "expected every table to be created");

    Ok(())
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_cache_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config)?;

    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    let key = "integration_test_snapshot";
    let snapshot = Snapshot {
        items: vec!["nmap".to_string(), "ghidra".to_string()],
    };

    redis_pool.set_json(key, &snapshot, Some(10)).await?;
    let cached: Option<Snapshot> = redis_pool.get_json(key).await?;
    assert_eq!(cached, Some(snapshot));

    redis_pool.delete(key).await?;
    let cached: Option<Snapshot> = redis_pool.get_json(key).await?;
    assert_eq!(cached, None, "Redis delete operation failed");

    Ok(())
}
