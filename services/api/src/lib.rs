//! Portfolio API: public content, protected writeups, feeds and the admin panel

pub mod clients;
pub mod config;
pub mod error;
pub mod feeds;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod stats_fallback;

pub use state::AppState;

use anyhow::Result;
use common::{
    security::hash_password,
    validation::{validate_password, validate_username},
};
use tracing::info;

use crate::{config::ApiConfig, repositories::AdminRepository};

/// Create the configured admin account when it does not exist yet
pub async fn bootstrap_admin(admins: &AdminRepository, config: &ApiConfig) -> Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    validate_username(username).map_err(|e| anyhow::anyhow!("Invalid admin username: {}", e))?;
    validate_password(password).map_err(|e| anyhow::anyhow!("Invalid admin password: {}", e))?;

    if admins.find_by_username(username).await?.is_some() {
        return Ok(());
    }

    let hashed = hash_password(password)?;
    if admins.create(username, &hashed).await?.is_some() {
        info!("Created admin account {}", username);
    }

    Ok(())
}
