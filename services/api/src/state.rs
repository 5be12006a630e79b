//! Application state shared across handlers

use anyhow::Result;
use common::cache::RedisPool;
use sqlx::PgPool;
use std::{net::IpAddr, sync::Arc};

use crate::{
    clients::{self, GeoLocator, Mailer},
    config::ApiConfig,
    feeds::{FeedService, StaticFeeds},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{
        AdminRepository, AuditRepository, ChallengeRepository, MemberRepository,
        NewsletterRepository, OtpRepository, StatsRepository,
    },
    stats_fallback::StatsFallback,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<ApiConfig>,
    /// Proxies allowed to report the client address
    pub trusted_proxies: Arc<[IpAddr]>,
    pub admin_repository: AdminRepository,
    pub audit_repository: AuditRepository,
    pub challenge_repository: ChallengeRepository,
    pub member_repository: MemberRepository,
    pub newsletter_repository: NewsletterRepository,
    pub otp_repository: OtpRepository,
    pub stats_repository: StatsRepository,
    pub stats_fallback: StatsFallback,
    pub feeds: FeedService,
    pub mailer: Mailer,
    pub geo: GeoLocator,
    pub login_limiter: RateLimiter,
    pub otp_limiter: RateLimiter,
    pub newsletter_limiter: RateLimiter,
}

impl AppState {
    /// Wire repositories, outbound clients and limiters around a pool and cache
    pub fn new(pool: PgPool, cache: RedisPool, config: ApiConfig) -> Result<Self> {
        let trusted_proxies: Arc<[IpAddr]> = config.trusted_proxy_list()?.into();
        let config = Arc::new(config);
        let http = clients::http_client(config.http_timeout_secs)?;

        Ok(Self {
            admin_repository: AdminRepository::new(pool.clone()),
            audit_repository: AuditRepository::new(pool.clone()),
            challenge_repository: ChallengeRepository::new(pool.clone()),
            member_repository: MemberRepository::new(pool.clone()),
            newsletter_repository: NewsletterRepository::new(pool.clone()),
            otp_repository: OtpRepository::new(pool.clone()),
            stats_repository: StatsRepository::new(pool.clone()),
            stats_fallback: StatsFallback::new(),
            feeds: FeedService::new(http.clone(), cache, config.clone(), StaticFeeds::load()?),
            mailer: Mailer::new(
                http.clone(),
                config.mail_api_url.clone(),
                config.mail_api_key.clone(),
                config.mail_from.clone(),
            ),
            geo: GeoLocator::new(http, config.geo_api_url.clone()),
            login_limiter: RateLimiter::new("admin_login", RateLimiterConfig::admin_login()),
            otp_limiter: RateLimiter::new("otp", RateLimiterConfig::otp()),
            newsletter_limiter: RateLimiter::new("newsletter", RateLimiterConfig::newsletter()),
            db_pool: pool,
            config,
            trusted_proxies,
        })
    }
}
