//! Admin accounts and sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Admin entity
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Session entity; only the SHA-256 of the bearer token is stored
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Authenticated admin, inserted into request extensions by the middleware
#[derive(Debug, Clone, Serialize)]
pub struct AdminIdentity {
    pub admin_id: Uuid,
    pub username: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Request for admin login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for admin login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}
