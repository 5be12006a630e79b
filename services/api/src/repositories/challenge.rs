//! Machine / room repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::parse_column;
use crate::models::challenge::{Challenge, ChallengeFilter, ChallengeKind, NewChallenge};

const COLUMNS: &str =
    "id, kind, name, difficulty, status, tags, password, writeup, created_at, updated_at";

/// Challenge repository
#[derive(Clone)]
pub struct ChallengeRepository {
    pool: PgPool,
}

impl ChallengeRepository {
    /// Create a new challenge repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Challenge> {
        Ok(Challenge {
            id: row.get("id"),
            kind: parse_column(row, "kind")?,
            name: row.get("name"),
            difficulty: parse_column(row, "difficulty")?,
            status: parse_column(row, "status")?,
            tags: row.get("tags"),
            password: row.get("password"),
            writeup: row.get("writeup"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    /// List records of one kind, newest first
    pub async fn list(&self, kind: ChallengeKind, filter: &ChallengeFilter) -> Result<Vec<Challenge>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS}
            FROM challenges
            WHERE kind = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR difficulty = $3)
              AND ($4::text IS NULL OR $4 = ANY(tags))
            ORDER BY created_at DESC
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.difficulty.map(|d| d.as_str()))
            .bind(filter.tag.as_deref().map(str::to_lowercase))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::map_row).collect()
    }

    /// Find a record of the given kind
    pub async fn find(&self, kind: ChallengeKind, id: Uuid) -> Result<Option<Challenge>> {
        let sql = format!("SELECT {COLUMNS} FROM challenges WHERE id = $1 AND kind = $2");

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Find a record regardless of kind
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Challenge>> {
        let sql = format!("SELECT {COLUMNS} FROM challenges WHERE id = $1");

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Insert a record; `None` when the name is already used for this kind
    pub async fn create(&self, new: &NewChallenge) -> Result<Option<Challenge>> {
        info!("Creating {} {}", new.kind, new.name);

        let sql = format!(
            r#"
            INSERT INTO challenges (kind, name, difficulty, status, tags, password, writeup)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (kind, name) DO NOTHING
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(new.kind.as_str())
            .bind(&new.name)
            .bind(new.difficulty.as_str())
            .bind(new.status.as_str())
            .bind(&new.tags)
            .bind(&new.password)
            .bind(&new.writeup)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Persist every mutable field of a record
    pub async fn update(&self, challenge: &Challenge) -> Result<Option<Challenge>> {
        info!("Updating {} {}", challenge.kind, challenge.id);

        let sql = format!(
            r#"
            UPDATE challenges
            SET name = $3, difficulty = $4, status = $5, tags = $6, password = $7,
                writeup = $8, updated_at = NOW()
            WHERE id = $1 AND kind = $2
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(challenge.id)
            .bind(challenge.kind.as_str())
            .bind(&challenge.name)
            .bind(challenge.difficulty.as_str())
            .bind(challenge.status.as_str())
            .bind(&challenge.tags)
            .bind(&challenge.password)
            .bind(&challenge.writeup)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Delete a record of the given kind
    pub async fn delete(&self, kind: ChallengeKind, id: Uuid) -> Result<bool> {
        info!("Deleting {} {}", kind, id);

        let result = sqlx::query("DELETE FROM challenges WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
