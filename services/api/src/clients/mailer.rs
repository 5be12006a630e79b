//! Transactional email provider client

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail delivery is not configured")]
    Disabled,

    #[error("Mail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail provider rejected the message ({0})")]
    Rejected(StatusCode),
}

#[derive(Debug, Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Client for a JSON mail API (`POST` with a bearer key)
#[derive(Debug, Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    /// Create a mailer; without an API key every send fails with [`MailError::Disabled`]
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            api_key,
            from: from.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a plain text message to one recipient
    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), MailError> {
        let api_key = self.api_key.as_deref().ok_or(MailError::Disabled)?;

        let body = OutgoingMail {
            from: &self.from,
            to: [to],
            subject,
            text,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status));
        }

        info!("Sent mail '{}'", subject);
        Ok(())
    }
}

/// Subject and body of the passcode mail
pub fn otp_message(otp: &str, challenge_name: &str, ttl_minutes: i64) -> (String, String) {
    let subject = format!("Your access code for {}", challenge_name);
    let text = format!(
        "Your one-time access code for the {} writeup is {}.\n\n\
         It expires in {} minutes and can only be used once. \
         If you did not request it, ignore this message.",
        challenge_name, otp, ttl_minutes
    );
    (subject, text)
}

/// Subject and body of the newsletter welcome mail
pub fn welcome_message(name: &str) -> (String, String) {
    let subject = "Welcome to the Breach Log newsletter".to_string();
    let text = format!(
        "Hi {},\n\nThanks for subscribing. New writeups, tools and CVE notes \
         will land in your inbox.\n",
        name
    );
    (subject, text)
}
