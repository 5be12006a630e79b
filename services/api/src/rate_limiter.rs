//! In-memory rate limiter for login, passcode and signup endpoints

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed within the window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl RateLimiterConfig {
    /// Admin login: 5 attempts per 5 minutes, then a 1 hour ban
    pub fn admin_login() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        }
    }

    /// Passcode issuance and verification: 5 per 10 minutes, 15 minute ban
    pub fn otp() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 600,
            ban_duration_seconds: 900,
        }
    }

    /// Newsletter signup: 3 per 10 minutes, 1 hour ban
    pub fn newsletter() -> Self {
        Self {
            max_attempts: 3,
            window_seconds: 600,
            ban_duration_seconds: 3600,
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::admin_login()
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

/// Rate limiter keyed by client IP or email
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: &'static str,
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(name: &'static str, config: RateLimiterConfig) -> Self {
        Self {
            name,
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key`; false when the key is over the limit or banned
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.ban_expires = None;
            entry.window_start = now;
        }

        if now.duration_since(entry.window_start) >= Duration::from_secs(self.config.window_seconds)
        {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Rate limiter {} banned a client for {} seconds",
                self.name, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget every attempt recorded for `key`
    pub async fn clear(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Drop entries whose window and ban are both over
    pub async fn prune(&self) {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);
        self.entries.lock().await.retain(|_, entry| {
            entry.ban_expires.is_some_and(|ban| now < ban)
                || now.duration_since(entry.window_start) < window
        });
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32) -> RateLimiter {
        RateLimiter::new(
            "test",
            RateLimiterConfig {
                max_attempts,
                window_seconds: 60,
                ban_duration_seconds: 60,
            },
        )
    }

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.is_allowed("10.0.0.1").await);
        }
        assert!(!limiter.is_allowed("10.0.0.1").await);
        // banned keys stay blocked
        assert!(!limiter.is_allowed("10.0.0.1").await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1);
        assert!(limiter.is_allowed("a@example.com").await);
        assert!(!limiter.is_allowed("a@example.com").await);
        assert!(limiter.is_allowed("b@example.com").await);
    }

    #[tokio::test]
    async fn test_clear_resets_key() {
        let limiter = limiter(1);
        assert!(limiter.is_allowed("10.0.0.2").await);
        assert!(!limiter.is_allowed("10.0.0.2").await);
        limiter.clear("10.0.0.2").await;
        assert!(limiter.is_allowed("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_window_expiry_resets_attempts() {
        let limiter = RateLimiter::new(
            "test",
            RateLimiterConfig {
                max_attempts: 1,
                window_seconds: 0,
                ban_duration_seconds: 60,
            },
        );
        assert!(limiter.is_allowed("k").await);
        assert!(limiter.is_allowed("k").await);
    }

    #[tokio::test]
    async fn test_prune_keeps_banned_and_recent_keys() {
        let stale = RateLimiter::new(
            "test",
            RateLimiterConfig {
                max_attempts: 5,
                window_seconds: 0,
                ban_duration_seconds: 60,
            },
        );
        assert!(stale.is_allowed("old").await);
        stale.prune().await;
        assert!(stale.entries.lock().await.is_empty());

        let limiter = limiter(1);
        assert!(limiter.is_allowed("recent").await);
        assert!(limiter.is_allowed("banned").await);
        assert!(!limiter.is_allowed("banned").await);
        limiter.prune().await;
        assert_eq!(limiter.entries.lock().await.len(), 2);
    }

    #[test]
    fn test_presets() {
        assert_eq!(RateLimiterConfig::admin_login().ban_duration_seconds, 3600);
        assert_eq!(RateLimiterConfig::otp().window_seconds, 600);
        assert_eq!(RateLimiterConfig::newsletter().max_attempts, 3);
    }
}
