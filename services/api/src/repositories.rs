//! Repositories for database operations

use anyhow::Result;
use sqlx::{Row, postgres::PgRow};
use std::str::FromStr;

pub mod admin;
pub mod audit;
pub mod challenge;
pub mod member;
pub mod newsletter;
pub mod otp;
pub mod stats;

pub use admin::AdminRepository;
pub use audit::AuditRepository;
pub use challenge::ChallengeRepository;
pub use member::MemberRepository;
pub use newsletter::NewsletterRepository;
pub use otp::OtpRepository;
pub use stats::StatsRepository;

/// Decode a text column into one of the model enums
pub(crate) fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    T::from_str(&raw).map_err(|e| anyhow::anyhow!("Invalid value in column {}: {}", column, e))
}
