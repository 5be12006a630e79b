//! HackTheBox / TryHackMe statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Rank shown before any progress is recorded
pub const DEFAULT_RANK: &str = "Unranked";

/// Training platform the counters belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Htb,
    Thm,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Htb => "htb",
            Platform::Thm => "thm",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "htb" | "hackthebox" => Ok(Platform::Htb),
            "thm" | "tryhackme" => Ok(Platform::Thm),
            other => Err(format!("Unknown platform '{}', expected htb or thm", other)),
        }
    }
}

/// Aggregate counters for one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub platform: Platform,
    pub machines_solved: i32,
    pub rank: String,
    pub score: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlatformStats {
    /// The documented reset values
    pub fn defaults(platform: Platform) -> Self {
        Self {
            platform,
            machines_solved: 0,
            rank: DEFAULT_RANK.to_string(),
            score: 0,
            updated_at: None,
        }
    }
}

/// Partial stats update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStatsRequest {
    pub machines_solved: Option<i32>,
    pub rank: Option<String>,
    pub score: Option<i32>,
}

impl UpdateStatsRequest {
    /// Apply the update on top of the current values
    pub fn apply(self, current: PlatformStats) -> Result<PlatformStats, String> {
        let mut next = current;

        if let Some(solved) = self.machines_solved {
            if solved < 0 {
                return Err("machines_solved must not be negative".to_string());
            }
            next.machines_solved = solved;
        }

        if let Some(score) = self.score {
            if score < 0 {
                return Err("score must not be negative".to_string());
            }
            next.score = score;
        }

        if let Some(rank) = self.rank {
            let rank = common::validation::sanitize_text(&rank, 64);
            if rank.is_empty() {
                return Err("rank must not be empty".to_string());
            }
            next.rank = rank;
        }

        Ok(next)
    }
}

/// Stats payload with the fallback marker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: PlatformStats,
    /// True when the values come from memory because the database failed
    pub fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parsing() {
        assert_eq!("htb".parse::<Platform>(), Ok(Platform::Htb));
        assert_eq!("TryHackMe".parse::<Platform>(), Ok(Platform::Thm));
        assert!("vulnhub".parse::<Platform>().is_err());
    }

    #[test]
    fn test_reset_defaults() {
        let stats = PlatformStats::defaults(Platform::Htb);
        assert_eq!(stats.machines_solved, 0);
        assert_eq!(stats.rank, "Unranked");
        assert_eq!(stats.score, 0);
    }

    #[test]
    fn test_partial_update_keeps_untouched_fields() {
        let current = PlatformStats {
            platform: Platform::Thm,
            machines_solved: 12,
            rank: "Hacker".to_string(),
            score: 4200,
            updated_at: None,
        };

        let update = UpdateStatsRequest {
            score: Some(5000),
            ..Default::default()
        };

        let next = update.apply(current).unwrap();
        assert_eq!(next.machines_solved, 12);
        assert_eq!(next.rank, "Hacker");
        assert_eq!(next.score, 5000);
    }

    #[test]
    fn test_update_rejects_negative_counters() {
        let update = UpdateStatsRequest {
            machines_solved: Some(-1),
            ..Default::default()
        };
        assert!(update.apply(PlatformStats::defaults(Platform::Htb)).is_err());
    }

    #[test]
    fn test_response_flattens_stats() {
        let response = StatsResponse {
            stats: PlatformStats::defaults(Platform::Htb),
            fallback: true,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["platform"], "htb");
        assert_eq!(value["rank"], "Unranked");
        assert_eq!(value["fallback"], true);
    }
}
