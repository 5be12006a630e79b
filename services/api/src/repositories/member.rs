//! Supporter member repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::parse_column;
use crate::models::member::{Member, NewMember};

/// Member repository
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Member> {
        Ok(Member {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            tier: parse_column(row, "tier")?,
            active: row.get("active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    pub async fn list(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, tier, active, created_at, updated_at
            FROM members
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Member>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, tier, active, created_at, updated_at
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Look a member up by (normalized) email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Member>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, tier, active, created_at, updated_at
            FROM members
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Insert a member; `None` when the email is already registered
    pub async fn create(&self, new: &NewMember) -> Result<Option<Member>> {
        info!("Creating member with tier {}", new.tier.as_str());

        let row = sqlx::query(
            r#"
            INSERT INTO members (name, email, tier, active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, name, email, tier, active, created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.tier.as_str())
        .bind(new.active)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    pub async fn update(&self, member: &Member) -> Result<Option<Member>> {
        let row = sqlx::query(
            r#"
            UPDATE members
            SET name = $2, tier = $3, active = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, tier, active, created_at, updated_at
            "#,
        )
        .bind(member.id)
        .bind(&member.name)
        .bind(member.tier.as_str())
        .bind(member.active)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
