//! Service configuration
//!
//! Defaults are set in code and overridden by `SITE_*` environment variables,
//! e.g. `SITE_GITHUB_USER=someone` or `SITE_OTP_TTL_MINUTES=5`.

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, builder::DefaultState};
use serde::Deserialize;
use std::net::IpAddr;

/// Runtime configuration for the API service
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Listen address
    pub bind_addr: String,
    /// Admin session lifetime
    pub session_ttl_hours: i64,
    /// Lifetime of a writeup passcode
    pub otp_ttl_minutes: i64,
    /// How long a merged feed snapshot stays in Redis
    pub feed_cache_ttl_secs: u64,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout_secs: u64,

    pub github_user: String,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub nvd_api_url: String,
    pub nvd_api_key: Option<String>,
    pub reddit_url: String,
    pub stackexchange_url: String,
    /// Comma-separated subreddit names
    pub subreddits: String,
    /// Semicolon-joined StackOverflow tags, as the StackExchange API expects
    pub stackoverflow_tags: String,

    pub geo_api_url: String,

    pub mail_api_url: String,
    pub mail_api_key: Option<String>,
    pub mail_from: String,

    /// Comma-separated allowed origins; empty allows any origin
    pub cors_origins: String,
    /// Comma-separated proxy addresses whose `X-Forwarded-For` is believed
    pub trusted_proxies: String,

    /// Account created on startup when both are set and the username is free
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl ApiConfig {
    /// Load the configuration from `SITE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self::defaults_builder()?
            .add_source(Environment::with_prefix("SITE").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize::<ApiConfig>()?.normalized())
    }

    /// Configuration with every default and no environment overrides
    pub fn defaults() -> Result<Self> {
        let config = Self::defaults_builder()?.build()?;
        Ok(config.try_deserialize::<ApiConfig>()?.normalized())
    }

    fn defaults_builder() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("session_ttl_hours", 24)?
            .set_default("otp_ttl_minutes", 10)?
            .set_default("feed_cache_ttl_secs", 900)?
            .set_default("http_timeout_secs", 10)?
            .set_default("github_user", "octocat")?
            .set_default("github_api_url", "https://api.github.com")?
            .set_default(
                "nvd_api_url",
                "https://services.nvd.nist.gov/rest/json/cves/2.0",
            )?
            .set_default("reddit_url", "https://www.reddit.com")?
            .set_default("stackexchange_url", "https://api.stackexchange.com/2.3")?
            .set_default("subreddits", "netsec,ReverseEngineering")?
            .set_default("stackoverflow_tags", "security")?
            .set_default("geo_api_url", "http://ip-api.com/json")?
            .set_default("mail_api_url", "https://api.resend.com/emails")?
            .set_default("mail_from", "Breach Log <no-reply@localhost>")?
            .set_default("cors_origins", "")?
            .set_default("trusted_proxies", "")?;

        Ok(builder)
    }

    /// Treat empty optional values as unset
    fn normalized(mut self) -> Self {
        for value in [
            &mut self.github_token,
            &mut self.nvd_api_key,
            &mut self.mail_api_key,
            &mut self.admin_username,
            &mut self.admin_password,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
        self
    }

    /// Subreddits to aggregate
    pub fn subreddit_list(&self) -> Vec<String> {
        split_list(&self.subreddits)
    }

    /// Allowed CORS origins
    pub fn cors_origin_list(&self) -> Vec<String> {
        split_list(&self.cors_origins)
    }

    /// Parsed trusted proxy addresses
    pub fn trusted_proxy_list(&self) -> Result<Vec<IpAddr>> {
        split_list(&self.trusted_proxies)
            .iter()
            .map(|raw| {
                raw.parse::<IpAddr>()
                    .with_context(|| format!("Invalid trusted proxy address '{}'", raw))
            })
            .collect()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
