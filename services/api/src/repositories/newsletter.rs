//! Newsletter subscriber repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::newsletter::{NewSubscriber, Subscriber};

/// Newsletter repository
#[derive(Clone)]
pub struct NewsletterRepository {
    pool: PgPool,
}

impl NewsletterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Subscriber {
        Subscriber {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            country: row.get("country"),
            ip: row.get("ip"),
            subscribed_at: row.get("subscribed_at"),
        }
    }

    /// Insert a subscriber; `None` when the email is already subscribed
    pub async fn create(&self, new: &NewSubscriber) -> Result<Option<Subscriber>> {
        let row = sqlx::query(
            r#"
            INSERT INTO newsletter_subscribers (name, email, country, ip)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, name, email, country, ip, subscribed_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.country)
        .bind(&new.ip)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::map_row))
    }

    pub async fn list(&self) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, country, ip, subscribed_at
            FROM newsletter_subscribers
            ORDER BY subscribed_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::map_row).collect())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM newsletter_subscribers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_email(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM newsletter_subscribers WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
