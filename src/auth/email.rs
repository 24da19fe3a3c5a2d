use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases an email taken from a request body.
pub(crate) fn normalize_email(raw: Option<&str>) -> Result<String, AppError> {
    let email = raw.map(|e| e.trim().to_lowercase()).unwrap_or_default();
    if email.is_empty() {
        return Err(AppError::MissingInput("Email"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::InvalidEmail);
    }
    Ok(email)
}
