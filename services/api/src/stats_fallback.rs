//! Last known platform statistics, kept in memory for database outages

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::models::stats::{Platform, PlatformStats};

/// Best-effort copy of the most recent stats per platform; lost on restart
#[derive(Debug, Clone, Default)]
pub struct StatsFallback {
    inner: Arc<RwLock<HashMap<Platform, PlatformStats>>>,
}

impl StatsFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value that was successfully read or written
    pub async fn remember(&self, stats: &PlatformStats) {
        self.inner
            .write()
            .await
            .insert(stats.platform, stats.clone());
    }

    /// Last remembered value, or the defaults
    pub async fn get(&self, platform: Platform) -> PlatformStats {
        self.inner
            .read()
            .await
            .get(&platform)
            .cloned()
            .unwrap_or_else(|| PlatformStats::defaults(platform))
    }
}
