//! Field-level validation shared by the people modules.

use crate::errors::{Error, Result};

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    max_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trims `value` and checks it is at most `max` characters. Empty is allowed.
pub(crate) fn optional_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    max_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

fn max_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Phone numbers are exactly 10 ASCII digits. When `required` is false an empty
/// value is accepted as well.
pub(crate) fn phone_number(field: &str, value: &str, required: bool) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() && !required {
        return Ok(String::new());
    }
    if trimmed.len() != 10 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "{field} must be exactly 10 digits"
        )));
    }
    Ok(trimmed.to_string())
}
