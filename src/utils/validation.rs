//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Length of issued API keys
pub const API_KEY_LENGTH: usize = 50;

/// Regex for manager-chosen key codes and generated `KEY-...` codes
static KEY_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").unwrap());

/// Regex for API keys
static API_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{50}$").unwrap());

/// Regex for hardware identifiers reported by the loader
static HWID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._:{}-]{1,128}$").unwrap());

/// Validate a key code
pub fn validate_key_code(code: &str) -> bool {
    KEY_CODE_REGEX.is_match(code)
}

/// Validate the shape of an API key before hashing it
pub fn validate_api_key(key: &str) -> bool {
    API_KEY_REGEX.is_match(key)
}

/// Validate a hardware identifier
pub fn validate_hwid(hwid: &str) -> bool {
    HWID_REGEX.is_match(hwid)
}

/// Validate an external identity (user, role, channel or message id)
pub fn validate_external_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && !id.chars().any(char::is_whitespace)
}
