//! Input validation utilities
//!
//! Payloads are trimmed before they are validated; the store receives the
//! trimmed values.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ApiError;

/// Longest accepted board, list, or card name
const MAX_NAME_LENGTH: usize = 200;

/// Longest accepted card description
const MAX_DESCRIPTION_LENGTH: usize = 10_000;

/// Validate a board, list, or card name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "Name must be at most {} characters long",
            MAX_NAME_LENGTH
        ));
    }

    Ok(())
}

/// Validate a card description
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description must be at most {} characters long",
            MAX_DESCRIPTION_LENGTH
        ));
    }

    Ok(())
}

/// Validate a user's full name
pub fn validate_full_name(full_name: &str) -> Result<(), String> {
    if full_name.is_empty() {
        return Err("Full name is required".to_string());
    }

    if full_name.chars().count() > 100 {
        return Err("Full name must be at most 100 characters long".to_string());
    }

    if !full_name.chars().any(char::is_alphanumeric) {
        return Err("Full name must contain at least one letter or digit".to_string());
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

    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        return Err("Password must contain at least one letter and one digit".to_string());
    }

    Ok(())
}

/// Attach the offending field to a validation failure
pub fn check(field: &'static str, result: Result<(), String>) -> Result<(), ApiError> {
    result.map_err(|message| ApiError::Validation { field, message })
}
