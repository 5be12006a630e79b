//! Outbound HTTP clients

pub mod geo;
pub mod mailer;

pub use geo::GeoLocator;
pub use mailer::{MailError, Mailer};

use anyhow::Result;
use std::time::Duration;

/// Shared HTTP client used for every outbound call
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("breach-log/", env!("CARGO_PKG_VERSION")))
        .gzip(true)
        .build()?;

    Ok(client)
}
