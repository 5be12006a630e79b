//! One-time passcodes guarding protected writeups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stored passcode row
#[derive(Debug, Clone)]
pub struct OtpVerification {
    pub id: Uuid,
    pub email: String,
    pub challenge_id: Uuid,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a submitted passcode was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpRejection {
    #[error("Verification code has already been used")]
    AlreadyUsed,
    #[error("Verification code has expired")]
    Expired,
    #[error("Invalid verification code")]
    Mismatch,
}

impl OtpVerification {
    /// Check a submitted passcode hash at time `now`
    ///
    /// Single use wins over expiry, expiry over mismatch, so a reused code is
    /// reported as used even after it would have expired.
    pub fn check(&self, submitted_hash: &str, now: DateTime<Utc>) -> Result<(), OtpRejection> {
        if self.verified {
            return Err(OtpRejection::AlreadyUsed);
        }

        if now >= self.expires_at {
            return Err(OtpRejection::Expired);
        }

        if !common::security::secrets_match(submitted_hash, &self.otp_hash) {
            return Err(OtpRejection::Mismatch);
        }

        Ok(())
    }
}

/// Request a passcode for a protected writeup
#[derive(Debug, Clone, Deserialize)]
pub struct RequestOtpRequest {
    pub email: String,
    pub password: String,
    pub machine_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOtpResponse {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Redeem a passcode
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    pub machine_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::security::sha256_hex;

    fn issued_at(now: DateTime<Utc>, otp: &str) -> OtpVerification {
        OtpVerification {
            id: Uuid::new_v4(),
            email: "reader@example.org".to_string(),
            challenge_id: Uuid::new_v4(),
            otp_hash: sha256_hex(otp),
            expires_at: now + Duration::minutes(10),
            verified: false,
            created_at: now,
        }
    }

    #[test]
    fn test_fresh_code_is_accepted() {
        let now = Utc::now();
        let record = issued_at(now, "123456");
        assert_eq!(record.check(&sha256_hex("123456"), now), Ok(()));
        assert_eq!(
            record.check(&sha256_hex("123456"), now + Duration::minutes(9)),
            Ok(())
        );
    }

    #[test]
    fn test_code_older_than_ten_minutes_is_rejected() {
        let now = Utc::now();
        let record = issued_at(now, "123456");
        assert_eq!(
            record.check(&sha256_hex("123456"), now + Duration::minutes(10)),
            Err(OtpRejection::Expired)
        );
        assert_eq!(
            record.check(&sha256_hex("123456"), now + Duration::minutes(11)),
            Err(OtpRejection::Expired)
        );
    }

    #[test]
    fn test_verified_code_cannot_be_reused() {
        let now = Utc::now();
        let mut record = issued_at(now, "123456");
        record.verified = true;
        assert_eq!(
            record.check(&sha256_hex("123456"), now),
            Err(OtpRejection::AlreadyUsed)
        );
    }

    #[test]
    fn test_wrong_code_is_rejected() {
        let now = Utc::now();
        let record = issued_at(now, "123456");
        assert_eq!(
            record.check(&sha256_hex("654321"), now),
            Err(OtpRejection::Mismatch)
        );
    }
}
