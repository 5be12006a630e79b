//! Platform statistics repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::parse_column;
use crate::models::stats::{Platform, PlatformStats};

/// Stats repository; one row per platform
#[derive(Clone)]
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<PlatformStats> {
        Ok(PlatformStats {
            platform: parse_column(row, "platform")?,
            machines_solved: row.get("machines_solved"),
            rank: row.get("rank"),
            score: row.get("score"),
            updated_at: row.get("updated_at"),
        })
    }

    /// Current counters, or the defaults when nothing was recorded yet
    pub async fn get(&self, platform: Platform) -> Result<PlatformStats> {
        let row = sqlx::query(
            r#"
            SELECT platform, machines_solved, rank, score, updated_at
            FROM platform_stats
            WHERE platform = $1
            "#,
        )
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::map_row(&row),
            None => Ok(PlatformStats::defaults(platform)),
        }
    }

    /// Write the counters of a platform
    pub async fn upsert(&self, stats: &PlatformStats) -> Result<PlatformStats> {
        let row = sqlx::query(
            r#"
            INSERT INTO platform_stats (platform, machines_solved, rank, score, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (platform) DO UPDATE SET
                machines_solved = EXCLUDED.machines_solved,
                rank = EXCLUDED.rank,
                score = EXCLUDED.score,
                updated_at = NOW()
            RETURNING platform, machines_solved, rank, score, updated_at
            "#,
        )
        .bind(stats.platform.as_str())
        .bind(stats.machines_solved)
        .bind(&stats.rank)
        .bind(stats.score)
        .fetch_one(&self.pool)
        .await?;

        Self::map_row(&row)
    }
}
