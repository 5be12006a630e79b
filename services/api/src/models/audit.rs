//! Append-only audit rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action performed by an admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLogEntry {
    pub id: i64,
    pub admin_id: Option<Uuid>,
    pub username: String,
    pub action: String,
    pub target: Option<String>,
    pub details: serde_json::Value,
    pub ip: String,
    pub created_at: DateTime<Utc>,
}

/// Rejected request against the admin surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnauthorizedAccessEntry {
    pub id: i64,
    pub ip: String,
    pub method: String,
    pub path: String,
    pub reason: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUnauthorizedAccess {
    pub ip: String,
    pub method: String,
    pub path: String,
    pub reason: String,
    pub user_agent: Option<String>,
}
