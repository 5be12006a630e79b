//! Machine (HackTheBox) and room (TryHackMe) records

use chrono::{DateTime, Utc};
use common::validation::{sanitize_text, validate_name, validate_tags};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::double_option;

const MAX_PASSWORD_LEN: usize = 128;
const MAX_WRITEUP_LEN: usize = 200_000;

/// Machine or room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Machine,
    Room,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Machine => "machine",
            ChallengeKind::Room => "room",
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "machine" => Ok(ChallengeKind::Machine),
            "room" => Ok(ChallengeKind::Room),
            other => Err(format!("Unknown challenge kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Insane,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Insane => "insane",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "insane" => Ok(Difficulty::Insane),
            other => Err(format!("Unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Active,
    Retired,
    InProgress,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Active => "active",
            ChallengeStatus::Retired => "retired",
            ChallengeStatus::InProgress => "in_progress",
        }
    }
}

impl FromStr for ChallengeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ChallengeStatus::Active),
            "retired" => Ok(ChallengeStatus::Retired),
            "in_progress" => Ok(ChallengeStatus::InProgress),
            other => Err(format!("Unknown status '{}'", other)),
        }
    }
}

/// Full record, as seen by the admin panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub kind: ChallengeKind,
    pub name: String,
    pub difficulty: Difficulty,
    pub status: ChallengeStatus,
    pub tags: Vec<String>,
    pub password: Option<String>,
    pub writeup: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    /// Public view without the password or the writeup body
    pub fn summary(&self) -> ChallengeSummary {
        ChallengeSummary {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            difficulty: self.difficulty,
            status: self.status,
            tags: self.tags.clone(),
            protected: self.password.is_some(),
            has_writeup: self.writeup.is_some(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public view of a record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSummary {
    pub id: Uuid,
    pub kind: ChallengeKind,
    pub name: String,
    pub difficulty: Difficulty,
    pub status: ChallengeStatus,
    pub tags: Vec<String>,
    pub protected: bool,
    pub has_writeup: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated values for a new record
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub kind: ChallengeKind,
    pub name: String,
    pub difficulty: Difficulty,
    pub status: ChallengeStatus,
    pub tags: Vec<String>,
    pub password: Option<String>,
    pub writeup: Option<String>,
}

/// Request to create a record
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChallengeRequest {
    pub name: String,
    pub difficulty: Difficulty,
    pub status: ChallengeStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub password: Option<String>,
    pub writeup: Option<String>,
}

impl CreateChallengeRequest {
    /// Sanitize and validate into a record of the given kind
    pub fn into_new(self, kind: ChallengeKind) -> Result<NewChallenge, String> {
        let name = sanitize_text(&self.name, 100);
        validate_name(&name)?;

        let tags = clean_tags(self.tags);
        validate_tags(&tags)?;

        if let Some(password) = &self.password {
            validate_secret(password)?;
        }
        if let Some(writeup) = &self.writeup {
            validate_writeup(writeup)?;
        }

        Ok(NewChallenge {
            kind,
            name,
            difficulty: self.difficulty,
            status: self.status,
            tags,
            password: self.password,
            writeup: self.writeup,
        })
    }
}

/// Partial update; `password` and `writeup` accept `null` to clear
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChallengeRequest {
    pub name: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<ChallengeStatus>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub password: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub writeup: Option<Option<String>>,
}

impl UpdateChallengeRequest {
    /// Apply the update on top of the stored record
    pub fn apply(self, current: Challenge) -> Result<Challenge, String> {
        let mut next = current;

        if let Some(name) = self.name {
            let name = sanitize_text(&name, 100);
            validate_name(&name)?;
            next.name = name;
        }
        if let Some(difficulty) = self.difficulty {
            next.difficulty = difficulty;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(tags) = self.tags {
            let tags = clean_tags(tags);
            validate_tags(&tags)?;
            next.tags = tags;
        }
        if let Some(password) = self.password {
            if let Some(password) = &password {
                validate_secret(password)?;
            }
            next.password = password;
        }
        if let Some(writeup) = self.writeup {
            if let Some(writeup) = &writeup {
                validate_writeup(writeup)?;
            }
            next.writeup = writeup;
        }

        Ok(next)
    }
}

/// Listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeFilter {
    pub status: Option<ChallengeStatus>,
    pub difficulty: Option<Difficulty>,
    pub tag: Option<String>,
}

/// Writeup body returned once access is granted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteupResponse {
    pub machine_id: Uuid,
    pub name: String,
    pub writeup: String,
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = sanitize_text(&tag, 64).to_lowercase();
        if !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}

fn validate_secret(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password must not be empty; use null to remove it".to_string());
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LEN
        ));
    }
    Ok(())
}

fn validate_writeup(writeup: &str) -> Result<(), String> {
    if writeup.trim().is_empty() {
        return Err("Writeup must not be empty; use null to remove it".to_string());
    }
    if writeup.len() > MAX_WRITEUP_LEN {
        return Err("Writeup is too long".to_string());
    }
    Ok(())
}
