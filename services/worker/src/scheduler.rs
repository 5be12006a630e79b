//! Periodic maintenance jobs

use anyhow::Result;
use api::{
    feeds::FeedService,
    repositories::{AdminRepository, OtpRepository},
};
use std::env;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Cron schedules (six fields, seconds first)
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub session_cleanup_schedule: String,
    pub otp_cleanup_schedule: String,
    pub feed_warm_schedule: String,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self {
            session_cleanup_schedule: env::var("WORKER_SESSION_CLEANUP_SCHEDULE")
                .unwrap_or_else(|_| "0 */15 * * * *".to_string()),
            otp_cleanup_schedule: env::var("WORKER_OTP_CLEANUP_SCHEDULE")
                .unwrap_or_else(|_| "0 0 * * * *".to_string()),
            feed_warm_schedule: env::var("WORKER_FEED_WARM_SCHEDULE")
                .unwrap_or_else(|_| "0 */30 * * * *".to_string()),
        }
    }
}

/// Session and passcode purging plus feed cache warming
#[derive(Clone)]
pub struct Maintenance {
    admins: AdminRepository,
    otps: OtpRepository,
    feeds: FeedService,
}

impl Maintenance {
    pub fn new(admins: AdminRepository, otps: OtpRepository, feeds: FeedService) -> Self {
        Self {
            admins,
            otps,
            feeds,
        }
    }

    pub async fn purge_sessions(&self) {
        match self.admins.cleanup_sessions().await {
            Ok(removed) => info!("Removed {} expired or inactive admin sessions", removed),
            Err(e) => error!("Failed to clean up admin sessions: {}", e),
        }
    }

    pub async fn purge_otps(&self) {
        if let Err(e) = self.otps.purge_stale().await {
            error!("Failed to purge verification codes: {}", e);
        }
    }

    pub async fn warm_feeds(&self) {
        self.feeds.warm().await;
    }

    /// Register every job and start the scheduler
    pub async fn start(&self, config: &WorkerConfig) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new().await?;

        let jobs = self.clone();
        scheduler
            .add(Job::new_async(
                config.session_cleanup_schedule.as_str(),
                move |_, _| {
                    let jobs = jobs.clone();
                    Box::pin(async move { jobs.purge_sessions().await })
                },
            )?)
            .await?;

        let jobs = self.clone();
        scheduler
            .add(Job::new_async(
                config.otp_cleanup_schedule.as_str(),
                move |_, _| {
                    let jobs = jobs.clone();
                    Box::pin(async move { jobs.purge_otps().await })
                },
            )?)
            .await?;

        let jobs = self.clone();
        scheduler
            .add(Job::new_async(
                config.feed_warm_schedule.as_str(),
                move |_, _| {
                    let jobs = jobs.clone();
                    Box::pin(async move { jobs.warm_feeds().await })
                },
            )?)
            .await?;

        scheduler.start().await?;

        info!(
            "Started maintenance scheduler (sessions: {}, codes: {}, feeds: {})",
            config.session_cleanup_schedule, config.otp_cleanup_schedule, config.feed_warm_schedule
        );
        Ok(scheduler)
    }
}
