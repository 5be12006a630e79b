//! Newsletter subscribers

use chrono::{DateTime, Utc};
use common::validation::{sanitize_text, validate_country, validate_email, validate_name};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::member::normalize_email;

/// Stored when neither the request nor the geolocation lookup yields a country
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Subscriber entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub country: String,
    pub ip: String,
    pub subscribed_at: DateTime<Utc>,
}

/// Validated values for a new subscriber
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub name: String,
    pub email: String,
    pub country: String,
    pub ip: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub name: String,
    pub email: String,
    pub country: Option<String>,
}

/// Sanitized signup fields; the country is resolved later when absent
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSignup {
    pub name: String,
    pub email: String,
    pub country: Option<String>,
}

impl SubscribeRequest {
    pub fn validated(self) -> Result<ValidSignup, String> {
        let name = sanitize_text(&self.name, 100);
        validate_name(&name)?;

        let email = normalize_email(&self.email);
        validate_email(&email)?;

        let country = match self.country {
            Some(raw) => {
                let country = sanitize_text(&raw, 64);
                if country.is_empty() {
                    None
                } else {
                    validate_country(&country)?;
                    Some(country)
                }
            }
            None => None,
        };

        Ok(ValidSignup {
            name,
            email,
            country,
        })
    }
}

impl ValidSignup {
    pub fn into_new(self, country: String, ip: String) -> NewSubscriber {
        NewSubscriber {
            name: self.name,
            email: self.email,
            country,
            ip,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

/// Public confirmation; the stored IP is only visible to the admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub country: String,
    pub subscribed_at: DateTime<Utc>,
}

impl From<Subscriber> for SubscribeResponse {
    fn from(subscriber: Subscriber) -> Self {
        Self {
            id: subscriber.id,
            name: subscriber.name,
            email: subscriber.email,
            country: subscriber.country,
            subscribed_at: subscriber.subscribed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, country: Option<&str>) -> SubscribeRequest {
        SubscribeRequest {
            name: name.to_string(),
            email: email.to_string(),
            country: country.map(str::to_string),
        }
    }

    #[test]
    fn test_signup_is_normalized() {
        let signup = request(" Ada ", "Ada@Example.COM ", Some("Cameroon"))
            .validated()
            .unwrap();
        assert_eq!(signup.name, "Ada");
        assert_eq!(signup.email, "ada@example.com");
        assert_eq!(signup.country.as_deref(), Some("Cameroon"));
    }

    #[test]
    fn test_blank_country_is_resolved_later() {
        let signup = request("Ada", "ada@example.com", Some("  ")).validated().unwrap();
        assert!(signup.country.is_none());
    }

    #[test]
    fn test_invalid_fields_are_rejected() {
        assert!(request("", "ada@example.com", None).validated().is_err());
        assert!(request("Ada", "not-an-email", None).validated().is_err());
        assert!(request("Ada", "ada@example.com", Some("C4meroon")).validated().is_err());
    }

    #[test]
    fn test_response_hides_ip() {
        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            country: UNKNOWN_COUNTRY.to_string(),
            ip: "203.0.113.9".to_string(),
            subscribed_at: Utc::now(),
        };
        let value = serde_json::to_value(SubscribeResponse::from(subscriber)).unwrap();
        assert!(value.get("ip").is_none());
    }
}
