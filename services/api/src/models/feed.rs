//! Aggregated feed items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that can be merged by identifier
pub trait FeedItem {
    fn feed_id(&self) -> &str;
}

/// Tool or repository listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// `owner/repo`
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub language: Option<String>,
    #[serde(default)]
    pub stars: u64,
    pub category: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FeedItem for Tool {
    fn feed_id(&self) -> &str {
        &self.id
    }
}

/// CVE summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveItem {
    pub id: String,
    pub description: String,
    pub published: DateTime<Utc>,
    pub score: Option<f64>,
    pub severity: Option<String>,
    pub url: String,
}

impl FeedItem for CveItem {
    fn feed_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForumSource {
    Reddit,
    Stackoverflow,
}

/// Forum thread or question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumPost {
    /// `reddit:<id>` or `so:<question_id>`
    pub id: String,
    pub source: ForumSource,
    pub title: String,
    pub url: String,
    pub author: String,
    pub score: i64,
    /// Subreddit or joined tags
    pub community: String,
    pub created_at: DateTime<Utc>,
}

impl FeedItem for ForumPost {
    fn feed_id(&self) -> &str {
        &self.id
    }
}

/// Where the items of a feed response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Live,
    Cache,
    Static,
}

/// Feed payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse<T> {
    pub items: Vec<T>,
    pub source: FeedSource,
    /// True whenever some upstream failed and the items are not fully live
    pub fallback: bool,
    pub fetched_at: DateTime<Utc>,
}

impl<T> FeedResponse<T> {
    pub fn new(items: Vec<T>, source: FeedSource, fallback: bool) -> Self {
        Self {
            items,
            source,
            fallback,
            fetched_at: Utc::now(),
        }
    }
}

/// Query parameters for the CVE feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CveQuery {
    pub days: Option<i64>,
    pub limit: Option<usize>,
    pub severity: Option<String>,
}

impl CveQuery {
    pub fn validated(&self) -> Result<(i64, usize, Option<String>), String> {
        let days = self.days.unwrap_or(7);
        if !(1..=30).contains(&days) {
            return Err("days must be between 1 and 30".to_string());
        }

        let limit = self.limit.unwrap_or(20);
        if !(1..=100).contains(&limit) {
            return Err("limit must be between 1 and 100".to_string());
        }

        let severity = match self.severity.as_deref().map(str::to_ascii_uppercase) {
            None => None,
            Some(s) if ["LOW", "MEDIUM", "HIGH", "CRITICAL"].contains(&s.as_str()) => Some(s),
            Some(_) => {
                return Err("severity must be one of low, medium, high, critical".to_string());
            }
        };

        Ok((days, limit, severity))
    }
}

/// Query parameters for the forum feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForumQuery {
    pub limit: Option<usize>,
}

impl ForumQuery {
    pub fn validated(&self) -> Result<usize, String> {
        let limit = self.limit.unwrap_or(30);
        if !(1..=100).contains(&limit) {
            return Err("limit must be between 1 and 100".to_string());
        }
        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cve_query_defaults() {
        let (days, limit, severity) = CveQuery::default().validated().unwrap();
        assert_eq!(days, 7);
        assert_eq!(limit, 20);
        assert!(severity.is_none());
    }

    #[test]
    fn test_cve_query_bounds() {
        let query = CveQuery {
            days: Some(31),
            ..Default::default()
        };
        assert!(query.validated().is_err());

        let query = CveQuery {
            severity: Some("critical".to_string()),
            ..Default::default()
        };
        assert_eq!(query.validated().unwrap().2.as_deref(), Some("CRITICAL"));

        let query = CveQuery {
            severity: Some("spicy".to_string()),
            ..Default::default()
        };
        assert!(query.validated().is_err());
    }

    #[test]
    fn test_forum_query_bounds() {
        assert_eq!(ForumQuery::default().validated(), Ok(30));
        assert!(ForumQuery { limit: Some(0) }.validated().is_err());
    }
}
