//! Passcode repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::otp::OtpVerification;

/// OTP repository
#[derive(Clone)]
pub struct OtpRepository {
    pool: PgPool,
}

impl OtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> OtpVerification {
        OtpVerification {
            id: row.get("id"),
            email: row.get("email"),
            challenge_id: row.get("challenge_id"),
            otp_hash: row.get("otp_hash"),
            expires_at: row.get("expires_at"),
            verified: row.get("verified"),
            created_at: row.get("created_at"),
        }
    }

    /// Store the hash of a freshly issued passcode
    pub async fn create(
        &self,
        email: &str,
        challenge_id: Uuid,
        otp_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpVerification> {
        let row = sqlx::query(
            r#"
            INSERT INTO otp_verifications (email, challenge_id, otp_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, challenge_id, otp_hash, expires_at, verified, created_at
            "#,
        )
        .bind(email)
        .bind(challenge_id)
        .bind(otp_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::map_row(&row))
    }

    /// Most recently issued passcode for an email and challenge
    pub async fn latest(&self, email: &str, challenge_id: Uuid) -> Result<Option<OtpVerification>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, challenge_id, otp_hash, expires_at, verified, created_at
            FROM otp_verifications
            WHERE email = $1 AND challenge_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::map_row))
    }

    /// Flip the verified flag; false when another request already did
    pub async fn mark_verified(&self, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("UPDATE otp_verifications SET verified = TRUE WHERE id = $1 AND NOT verified")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete verified and expired passcodes
    pub async fn purge_stale(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM otp_verifications WHERE verified OR expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        info!("Purged {} stale verification codes", result.rows_affected());
        Ok(result.rows_affected())
    }
}
