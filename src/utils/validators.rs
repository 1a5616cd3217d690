use crate::utils::errors::StoreServiceError;
use lazy_static::lazy_static;
use regex::Regex;

/// Regex patterns for validation.
const USERNAME_PATTERN: &str = r"^[a-zA-Z0-9]{3,20}$"; // 3-20 alphanumeric characters.
const PASSWORD_PATTERN: &str = r"^[A-Za-z\d@#$%^&+=!*]{8,}$"; // At least 8 characters.
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$";

/// Error messages for validation.
const USERNAME_ERROR: &str =
    "Username must be 3-20 characters long and contain only letters and numbers.";
const EMAIL_ERROR: &str = "Invalid email format.";
const PASSWORD_ERROR: &str =
    "Password must be at least 8 characters long, contain a letter, a number, and a special character.";

lazy_static! {
    static ref USERNAME_REGEX: Regex =
        Regex::new(USERNAME_PATTERN).expect("Invalid regex for username");
    static ref EMAIL_REGEX: Regex = Regex::new(EMAIL_PATTERN).expect("Invalid regex for email");
    static ref PASSWORD_REGEX: Regex =
        Regex::new(PASSWORD_PATTERN).expect("Invalid regex for password");
}

/// Validates a username.
pub fn validate_username(username: &str) -> Result<(), StoreServiceError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(StoreServiceError::validation("username", USERNAME_ERROR))
    }
}

/// Validates an email address.
pub fn validate_email(email: &str) -> Result<(), StoreServiceError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(StoreServiceError::validation("email", EMAIL_ERROR))
    }
}

/// Validates a game title: non-empty after trimming, at most 100 characters.
pub fn validate_game_name(name: &str) -> Result<(), StoreServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > 100 {
        Err(StoreServiceError::validation(
            "name",
            "Game name must be 1-100 characters long.",
        ))
    } else {
        Ok(())
    }
}

/// Validates a password.
pub fn validate_password(password: &str) -> Result<(), StoreServiceError> {
    if PASSWORD_REGEX.is_match(password)
        && password.chars().any(|c| c.is_alphabetic())
        && password.chars().any(|c| c.is_numeric())
        && password.chars().any(|c| "@#$%^&+=!*".contains(c))
    {
        Ok(())
    } else {
        Err(StoreServiceError::validation("password", PASSWORD_ERROR))
    }
}
