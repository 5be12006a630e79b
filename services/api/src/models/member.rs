//! Supporter members allowed to unlock protected writeups

use chrono::{DateTime, Utc};
use common::validation::{sanitize_text, validate_email, validate_name};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Subscription level of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Supporter,
    Pro,
    Elite,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Supporter => "supporter",
            Tier::Pro => "pro",
            Tier::Elite => "elite",
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supporter" => Ok(Tier::Supporter),
            "pro" => Ok(Tier::Pro),
            "elite" => Ok(Tier::Elite),
            other => Err(format!("Unknown tier '{}'", other)),
        }
    }
}

/// Member entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub tier: Tier,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated values for a new member
#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    pub tier: Tier,
    pub active: bool,
}

/// Request to create a member
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub email: String,
    pub tier: Tier,
    pub active: Option<bool>,
}

impl CreateMemberRequest {
    pub fn into_new(self) -> Result<NewMember, String> {
        let name = sanitize_text(&self.name, 100);
        validate_name(&name)?;

        let email = normalize_email(&self.email);
        validate_email(&email)?;

        Ok(NewMember {
            name,
            email,
            tier: self.tier,
            active: self.active.unwrap_or(true),
        })
    }
}

/// Partial member update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub tier: Option<Tier>,
    pub active: Option<bool>,
}

impl UpdateMemberRequest {
    pub fn apply(self, current: Member) -> Result<Member, String> {
        let mut next = current;

        if let Some(name) = self.name {
            let name = sanitize_text(&name, 100);
            validate_name(&name)?;
            next.name = name;
        }
        if let Some(tier) = self.tier {
            next.tier = tier;
        }
        if let Some(active) = self.active {
            next.active = active;
        }

        Ok(next)
    }
}

/// Emails are compared case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
