//! External feed aggregation
//!
//! Every feed merges a curated list shipped with the service with items fetched
//! from a third-party API. A successful fetch is cached in Redis; when the
//! upstream fails the cached copy is served, and without one the curated list.

pub mod forums;
pub mod github;
pub mod merge;
pub mod nvd;

pub use merge::merge_by_id;

use anyhow::{Context, Result, anyhow};
use common::cache::RedisPool;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::ApiConfig,
    models::feed::{CveItem, FeedItem, FeedResponse, FeedSource, ForumPost, Tool},
};

const TOOLS_KEY: &str = "feeds:tools";
const FORUMS_KEY: &str = "feeds:forums";

/// Curated lists bundled with the binary
#[derive(Debug, Clone)]
pub struct StaticFeeds {
    pub tools: Vec<Tool>,
    pub cves: Vec<CveItem>,
    pub forums: Vec<ForumPost>,
}

impl StaticFeeds {
    pub fn load() -> Result<Self> {
        Ok(Self {
            tools: serde_json::from_str(include_str!("../data/tools.json"))
                .context("Invalid data/tools.json")?,
            cves: serde_json::from_str(include_str!("../data/cves.json"))
                .context("Invalid data/cves.json")?,
            forums: serde_json::from_str(include_str!("../data/forums.json"))
                .context("Invalid data/forums.json")?,
        })
    }
}

/// Feed aggregation service
#[derive(Clone)]
pub struct FeedService {
    http: reqwest::Client,
    cache: RedisPool,
    config: Arc<ApiConfig>,
    static_feeds: Arc<StaticFeeds>,
}

impl FeedService {
    pub fn new(
        http: reqwest::Client,
        cache: RedisPool,
        config: Arc<ApiConfig>,
        static_feeds: StaticFeeds,
    ) -> Self {
        Self {
            http,
            cache,
            config,
            static_feeds: Arc::new(static_feeds),
        }
    }

    /// Tools and repositories
    pub async fn tools(&self) -> FeedResponse<Tool> {
        let live = github::fetch_tools(
            &self.http,
            &self.config.github_api_url,
            &self.config.github_user,
            self.config.github_token.as_deref(),
        )
        .await;

        self.resolve(TOOLS_KEY, &self.static_feeds.tools, live, false)
            .await
    }

    /// Recent CVEs, newest first, optionally restricted to one severity
    pub async fn cves(
        &self,
        days: i64,
        limit: usize,
        severity: Option<&str>,
    ) -> FeedResponse<CveItem> {
        let live = nvd::fetch_cves(
            &self.http,
            &self.config.nvd_api_url,
            self.config.nvd_api_key.as_deref(),
            days,
        )
        .await;

        let key = format!("feeds:cves:{}", days);
        let mut response = self.resolve(&key, &self.static_feeds.cves, live, false).await;

        if let Some(severity) = severity {
            response
                .items
                .retain(|item| item.severity.as_deref() == Some(severity));
        }
        response.items.sort_by(|a, b| b.published.cmp(&a.published));
        response.items.truncate(limit);
        response
    }

    /// Reddit and StackOverflow threads, newest first
    pub async fn forums(&self, limit: usize) -> FeedResponse<ForumPost> {
        let reddit = async {
            let mut posts = Vec::new();
            let mut failures = 0;
            let subreddits = self.config.subreddit_list();
            for subreddit in &subreddits {
                match forums::fetch_subreddit(&self.http, &self.config.reddit_url, subreddit, limit)
                    .await
                {
                    Ok(mut batch) => posts.append(&mut batch),
                    Err(e) => {
                        warn!("Reddit fetch for r/{} failed: {}", subreddit, e);
                        failures += 1;
                    }
                }
            }
            (posts, failures, subreddits.len())
        };
        let stackoverflow = forums::fetch_stackoverflow(
            &self.http,
            &self.config.stackexchange_url,
            &self.config.stackoverflow_tags,
            limit,
        );

        let ((mut posts, mut failures, mut attempts), stackoverflow) =
            tokio::join!(reddit, stackoverflow);

        attempts += 1;
        match stackoverflow {
            Ok(mut batch) => posts.append(&mut batch),
            Err(e) => {
                warn!("StackOverflow fetch failed: {}", e);
                failures += 1;
            }
        }

        let live = if failures == attempts {
            Err(anyhow!("Every forum source failed"))
        } else {
            Ok(posts)
        };

        let mut response = self
            .resolve(FORUMS_KEY, &self.static_feeds.forums, live, failures > 0)
            .await;
        response
            .items
            .sort_by(|a, b| b.created_at.cmp(&a.created_at));
        response.items.truncate(limit);
        response
    }

    /// Refresh every cache entry with the default parameters
    pub async fn warm(&self) -> usize {
        let mut live = 0;

        if self.tools().await.source == FeedSource::Live {
            live += 1;
        }
        if self.cves(7, 100, None).await.source == FeedSource::Live {
            live += 1;
        }
        if self.forums(100).await.source == FeedSource::Live {
            live += 1;
        }

        info!("Feed warm-up refreshed {}/3 feeds", live);
        live
    }

    async fn resolve<T>(
        &self,
        key: &str,
        static_items: &[T],
        live: Result<Vec<T>>,
        partial: bool,
    ) -> FeedResponse<T>
    where
        T: FeedItem + Clone + Serialize + DeserializeOwned,
    {
        match live {
            Ok(dynamic) => {
                let merged = merge_by_id(static_items.to_vec(), dynamic);
                if let Err(e) = self
                    .cache
                    .set_json(key, &merged, Some(self.config.feed_cache_ttl_secs))
                    .await
                {
                    warn!("Failed to cache feed {}: {}", key, e);
                }
                FeedResponse::new(merged, FeedSource::Live, partial)
            }
            Err(e) => {
                warn!("Live fetch for {} failed, falling back: {}", key, e);
                match self.cache.get_json::<Vec<T>>(key).await {
                    Ok(Some(items)) => FeedResponse::new(items, FeedSource::Cache, true),
                    Ok(None) => FeedResponse::new(static_items.to_vec(), FeedSource::Static, true),
                    Err(e) => {
                        warn!("Feed cache unavailable for {}: {}", key, e);
                        FeedResponse::new(static_items.to_vec(), FeedSource::Static, true)
                    }
                }
            }
        }
    }
}
