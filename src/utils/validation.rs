//! Request field validators
//!
//! Validation rules mirror the limits enforced at the API boundary:
//! all of these run before any provider or database work happens.

use crate::utils::error::{Result, ServiceError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted query length in characters
pub const MAX_QUERY_LENGTH: usize = 2000;

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("invalid username regex"));

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("invalid email regex")
});

/// Validate a username
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(ServiceError::validation("Username cannot be empty"));
    }

    if username.len() < 3 {
        return Err(ServiceError::validation(
            "Username must be at least 3 characters",
        ));
    }

    if username.len() > 50 {
        return Err(ServiceError::validation(
            "Username cannot exceed 50 characters",
        ));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ServiceError::validation(
            "Username may only contain letters, digits, underscores and hyphens",
        ));
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(ServiceError::validation("Invalid email format"));
    }
    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(ServiceError::validation(
            "Password must be at least 8 characters",
        ));
    }

    if password.len() > 128 {
        return Err(ServiceError::validation(
            "Password cannot exceed 128 characters",
        ));
    }

    Ok(())
}

/// Validate a query text before it is sent to the completion provider
pub fn validate_query(query: &str) -> Result<()> {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        return Err(ServiceError::validation("Query text is required"));
    }

    if trimmed.chars().count() > MAX_QUERY_LENGTH {
        return Err(ServiceError::validation(format!(
            "Query must be between 1 and {} characters",
            MAX_QUERY_LENGTH
        )));
    }

    Ok(())
}
