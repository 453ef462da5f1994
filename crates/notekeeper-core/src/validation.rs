//! Input validation shared by the web forms, the REST API, and the bot.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::defaults::{
    EXTERNAL_USERNAME_PREFIX, LABEL_MAX_LENGTH, PASSWORD_MIN_LENGTH, TITLE_MAX_LENGTH,
};
use crate::error::{Error, Result};
use crate::models::NoteInput;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.@+-]{3,150}$").expect("username pattern is valid")
});

/// Validate a web registration username.
///
/// Rules:
/// - 3 to 150 characters
/// - letters, digits, and `_ . @ + -` only
/// - must not start with the prefix reserved for chat-created accounts
pub fn validate_username(username: &str) -> Result<()> {
    if !USERNAME_RE.is_match(username) {
        return Err(Error::InvalidInput(
            "Username must be 3-150 characters: letters, digits and _ . @ + - only".to_string(),
        ));
    }
    if username
        .to_lowercase()
        .starts_with(EXTERNAL_USERNAME_PREFIX)
    {
        return Err(Error::InvalidInput(format!(
            "Usernames starting with '{}' are reserved",
            EXTERNAL_USERNAME_PREFIX
        )));
    }
    Ok(())
}

/// Validate a new password and its confirmation.
pub fn validate_password(password: &str, confirmation: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LENGTH
        )));
    }
    if password != confirmation {
        return Err(Error::InvalidInput("Passwords do not match".to_string()));
    }
    Ok(())
}

/// Validate and normalize a category or tag name. Returns the trimmed name.
pub fn normalize_label(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > LABEL_MAX_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Name must be {} characters or less",
            LABEL_MAX_LENGTH
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::InvalidInput(
            "Name cannot contain control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Split a comma-separated label list, dropping blanks and duplicates
/// (case-insensitive, first spelling wins).
pub fn parse_label_list(input: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for part in input.split(',') {
        if part.trim().is_empty() {
            continue;
        }
        let name = normalize_label(part)?;
        if !names.iter().any(|n| n.to_lowercase() == name.to_lowercase()) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Validate the note fields that do not depend on storage.
pub fn validate_note_input(input: &NoteInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(Error::InvalidInput("Title cannot be empty".to_string()));
    }
    if input.title.chars().count() > TITLE_MAX_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Title must be {} characters or less",
            TITLE_MAX_LENGTH
        )));
    }
    Ok(())
}

/// Reject deadlines before `today` (web form rule).
pub fn validate_deadline(deadline: NaiveDate, today: NaiveDate) -> Result<()> {
    if deadline < today {
        return Err(Error::InvalidInput(
            "Дата не может быть в прошлом".to_string(),
        ));
    }
    Ok(())
}
