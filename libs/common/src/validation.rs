//! Input validation and sanitizing utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::security::OTP_DIGITS;

/// Maximum number of tags on a machine or room
pub const MAX_TAGS: usize = 20;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;

    for c in password.chars() {
        if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if !c.is_alphanumeric() {
            has_special = true;
        }
    }

    if !has_upper {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !has_lower {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }

    if !has_special {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

/// Validate a submitted one-time passcode
pub fn validate_otp(otp: &str) -> Result<(), String> {
    if otp.len() != OTP_DIGITS || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("OTP must be exactly {} digits", OTP_DIGITS));
    }

    Ok(())
}

/// Strip control characters and angle brackets, trim, and cap the length in
/// characters.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_control() && *c != '<' && *c != '>')
        .collect();

    cleaned.trim().chars().take(max_len).collect::<String>().trim_end().to_string()
}

/// Validate a display name (already sanitized)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Validate a country name
pub fn validate_country(country: &str) -> Result<(), String> {
    if country.is_empty() {
        return Err("Country must not be empty".to_string());
    }

    if country.chars().count() > 64 {
        return Err("Country must be at most 64 characters long".to_string());
    }

    if !country
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'' || c == '.')
    {
        return Err("Country can only contain letters, spaces, and hyphens".to_string());
    }

    Ok(())
}

/// Validate a list of tags (already sanitized)
pub fn validate_tags(tags: &[String]) -> Result<(), String> {
    if tags.len() > MAX_TAGS {
        return Err(format!("At most {} tags are allowed", MAX_TAGS));
    }

    for tag in tags {
        if tag.is_empty() {
            return Err("Tags must not be empty".to_string());
        }
        if tag.chars().count() > 32 {
            return Err(format!("Tag '{}' is longer than 32 characters", tag));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("root_admin").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("reader@example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Str0ng!pass").is_ok());
        assert_eq!(
            validate_password("weakpass1!"),
            Err("Password must contain at least one uppercase letter".to_string())
        );
        assert!(validate_password("Sh0rt!").is_err());
    }

    #[test]
    fn test_otp_format() {
        assert!(validate_otp("012345").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("1234567").is_err());
        assert!(validate_otp("12a456").is_err());
    }

    #[test]
    fn test_sanitize_text_strips_markup_and_controls() {
        assert_eq!(
            sanitize_text("  <script>alert(1)</script>\u{0007} ", 100),
            "scriptalert(1)/script"
        );
        assert_eq!(sanitize_text("Jane\nDoe", 100), "JaneDoe");
    }

    #[test]
    fn test_sanitize_text_truncates_on_char_boundary() {
        assert_eq!(sanitize_text("ééééé", 3), "ééé");
        assert_eq!(sanitize_text("abc   def", 4), "abc");
    }

    #[test]
    fn test_country_rules() {
        assert!(validate_country("Côte d'Ivoire").is_ok());
        assert!(validate_country("Guinea-Bissau").is_ok());
        assert!(validate_country("DROP TABLE;").is_err());
        assert!(validate_country("").is_err());
    }

    #[test]
    fn test_tag_rules() {
        assert!(validate_tags(&["linux".to_string(), "web".to_string()]).is_ok());
        assert!(validate_tags(&[String::new()]).is_err());
        let many: Vec<String> = (0..21).map(|i| format!("t{}", i)).collect();
        assert!(validate_tags(&many).is_err());
    }
}
