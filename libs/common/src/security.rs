//! Password hashing, one-time passcodes and opaque session tokens

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::{Rng, RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Number of digits in a one-time passcode
pub const OTP_DIGITS: usize = 6;

/// Argon2 hash together with the salt it was derived from
#[derive(Debug, Clone)]
pub struct HashedPassword {
    /// PHC string (algorithm, parameters, salt and digest)
    pub hash: String,
    /// Salt, stored separately for auditing
    pub salt: String,
}

/// Hash a password with argon2 and a fresh random salt
pub fn hash_password(password: &str) -> Result<HashedPassword> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(HashedPassword {
        hash,
        salt: salt.as_str().to_string(),
    })
}

/// Verify a password against a stored argon2 hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a zero-padded numeric passcode from the OS random source
pub fn generate_otp() -> String {
    let code: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:06}", code)
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// 256-bit random token, hex encoded
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare two secrets for equality without short-circuiting on the first
/// differing byte.
pub fn secrets_match(provided: &str, stored: &str) -> bool {
    let (a, b) = (provided.as_bytes(), stored.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
