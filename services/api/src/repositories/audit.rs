//! Admin action log and unauthorized-access log

use anyhow::Result;
use sqlx::{PgPool, Row};

use crate::models::{
    admin::AdminIdentity,
    audit::{AdminLogEntry, NewUnauthorizedAccess, UnauthorizedAccessEntry},
};

/// Audit repository; rows are only ever appended or read
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an admin action
    pub async fn log_admin_action(
        &self,
        identity: &AdminIdentity,
        action: &str,
        target: Option<&str>,
        details: serde_json::Value,
        ip: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_logs (admin_id, username, action, target, details, ip)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(identity.admin_id)
        .bind(&identity.username)
        .bind(action)
        .bind(target)
        .bind(details)
        .bind(ip)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent admin actions first
    pub async fn list_admin_logs(&self, limit: i64) -> Result<Vec<AdminLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, admin_id, username, action, target, details, ip, created_at
            FROM admin_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AdminLogEntry {
                id: row.get("id"),
                admin_id: row.get("admin_id"),
                username: row.get("username"),
                action: row.get("action"),
                target: row.get("target"),
                details: row.get("details"),
                ip: row.get("ip"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Append a rejected access attempt
    pub async fn log_unauthorized(&self, entry: &NewUnauthorizedAccess) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO unauthorized_access_logs (ip, method, path, reason, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&entry.ip)
        .bind(&entry.method)
        .bind(&entry.path)
        .bind(&entry.reason)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent rejected attempts first
    pub async fn list_unauthorized(&self, limit: i64) -> Result<Vec<UnauthorizedAccessEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, ip, method, path, reason, user_agent, created_at
            FROM unauthorized_access_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UnauthorizedAccessEntry {
                id: row.get("id"),
                ip: row.get("ip"),
                method: row.get("method"),
                path: row.get("path"),
                reason: row.get("reason"),
                user_agent: row.get("user_agent"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
