//! Input validation and sanitization for account fields.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Validation error types.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Input exceeds maximum allowed length.
    #[error("{field} exceeds maximum length ({max} bytes, got {actual})")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
        /// Actual input length.
        actual: usize,
    },

    /// Required field is missing or blank.
    #[error("{0} is required")]
    Missing(&'static str),

    /// Disallowed characters in input.
    #[error("Disallowed characters in {0}")]
    DisallowedChars(&'static str),
}

/// Size limits per field type.
pub mod limits {
    /// Maximum length of a profile text field (names, contact number).
    pub const MAX_FIELD_LENGTH: usize = 255;

    /// Maximum length of a username.
    pub const MAX_USERNAME_LENGTH: usize = 64;

    /// Maximum length of a plaintext password.
    pub const MAX_PASSWORD_LENGTH: usize = 1024;

    /// Maximum length of a picture URL.
    pub const MAX_URL_LENGTH: usize = 2048;
}

/// Sanitize a free-text account field.
///
/// Trims surrounding whitespace, strips control characters and applies NFKC
/// normalization so visually identical usernames compare equal.
///
/// # Errors
///
/// Returns `ValidationError::TooLong` if the raw input exceeds `max_len`.
pub fn sanitize_field(
    field: &'static str,
    input: &str,
    max_len: usize,
) -> Result<String, ValidationError> {
    if input.len() > max_len {
        return Err(ValidationError::TooLong {
            field,
            max: max_len,
            actual: input.len(),
        });
    }

    let stripped: String = input.chars().filter(|c| !c.is_control()).collect();
    Ok(stripped.trim().nfkc().collect())
}

/// Sanitize a field that must be present and non-blank.
///
/// # Errors
///
/// Returns `ValidationError::Missing` for absent or blank input.
pub fn require_field(
    field: &'static str,
    input: Option<&str>,
    max_len: usize,
) -> Result<String, ValidationError> {
    let value = sanitize_field(field, input.unwrap_or_default(), max_len)?;
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(value)
}

/// Sanitize an optional field, mapping blank input to `None`.
///
/// # Errors
///
/// Returns `ValidationError::TooLong` if the input exceeds `max_len`.
pub fn optional_field(
    field: &'static str,
    input: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    match input {
        Some(raw) => {
            let value = sanitize_field(field, raw, max_len)?;
            Ok((!value.is_empty()).then_some(value))
        }
        None => Ok(None),
    }
}

/// Validate a plaintext password.
///
/// Passwords are not normalized or trimmed; only presence, length and NUL
/// bytes are checked.
///
/// # Errors
///
/// Returns error if the password is empty, too long, or contains NUL.
pub fn validate_password(input: Option<&str>) -> Result<(), ValidationError> {
    let password = input.unwrap_or_default();
    if password.is_empty() {
        return Err(ValidationError::Missing("PASSWORD"));
    }
    if password.len() > limits::MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: "PASSWORD",
            max: limits::MAX_PASSWORD_LENGTH,
            actual: password.len(),
        });
    }
    if password.contains('\0') {
        return Err(ValidationError::DisallowedChars("PASSWORD"));
    }
    Ok(())
}

/// Validate a relative file name or path to prevent path traversal.
///
/// # Errors
///
/// Returns error if path contains traversal sequences.
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    if path.contains("..") || path.contains('\0') {
        return Err(ValidationError::DisallowedChars("path"));
    }
    Ok(())
}
