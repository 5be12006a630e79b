//! Admin account and session repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::security::HashedPassword;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::admin::{AdminIdentity, AdminSession, AdminUser};

/// Admin repository
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    /// Create a new admin repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_admin(row: &PgRow) -> AdminUser {
        AdminUser {
            id: row.get("id"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            salt: row.get("salt"),
            active: row.get("active"),
            last_login_at: row.get("last_login_at"),
            created_at: row.get("created_at"),
        }
    }

    /// Create an admin; `None` when the username is taken
    pub async fn create(
        &self,
        username: &str,
        password: &HashedPassword,
    ) -> Result<Option<AdminUser>> {
        info!("Creating admin user: {}", username);

        let row = sqlx::query(
            r#"
            INSERT INTO admin_users (username, password_hash, salt)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            RETURNING id, username, password_hash, salt, active, last_login_at, created_at
            "#,
        )
        .bind(username)
        .bind(&password.hash)
        .bind(&password.salt)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::map_admin))
    }

    /// Find an admin by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, salt, active, last_login_at, created_at
            FROM admin_users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::map_admin))
    }

    /// Stamp a successful login
    pub async fn record_login(&self, admin_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE admin_users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(admin_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Open a session for an admin
    pub async fn create_session(
        &self,
        admin_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AdminSession> {
        let row = sqlx::query(
            r#"
            INSERT INTO admin_sessions (admin_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, admin_id, token_hash, expires_at, active, created_at
            "#,
        )
        .bind(admin_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminSession {
            id: row.get("id"),
            admin_id: row.get("admin_id"),
            token_hash: row.get("token_hash"),
            expires_at: row.get("expires_at"),
            active: row.get("active"),
            created_at: row.get("created_at"),
        })
    }

    /// Resolve a token hash to an active, unexpired session of an active admin
    pub async fn find_active_session(&self, token_hash: &str) -> Result<Option<AdminIdentity>> {
        let row = sqlx::query(
            r#"
            SELECT s.id AS session_id, s.expires_at, u.id AS admin_id, u.username
            FROM admin_sessions s
            JOIN admin_users u ON u.id = s.admin_id
            WHERE s.token_hash = $1
              AND s.active
              AND s.expires_at > NOW()
              AND u.active
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| AdminIdentity {
            admin_id: row.get("admin_id"),
            username: row.get("username"),
            session_id: row.get("session_id"),
            expires_at: row.get("expires_at"),
        }))
    }

    /// Deactivate a session
    pub async fn deactivate_session(&self, session_id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE admin_sessions SET active = FALSE WHERE id = $1 AND active")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired and deactivated sessions, returning how many went away
    pub async fn cleanup_sessions(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM admin_sessions WHERE expires_at < NOW() OR NOT active")
                .execute(&self.pool)
                .await?;

        info!("Removed {} stale admin sessions", result.rows_affected());
        Ok(result.rows_affected())
    }
}
