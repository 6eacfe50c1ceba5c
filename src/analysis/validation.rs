//! Input validation
//!
//! Checks run before any request leaves the process.

use crate::error::ValidationError;

/// Minimum length of an analyzable text, in characters
pub const MIN_TEXT_CHARS: usize = 3;

/// Maximum length of an analyzable text, in characters
pub const MAX_TEXT_CHARS: usize = 5000;

/// Validate a text for single analysis, returning it trimmed
pub fn validate_text(raw: &str) -> Result<&str, ValidationError> {
    let text = validate_comparison_text(raw)?;
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ValidationError::TextTooLong {
            max: MAX_TEXT_CHARS,
        });
    }
    Ok(text)
}

/// Validate a text for the threshold comparator, returning it trimmed
///
/// The comparator has no upper length bound.
pub fn validate_comparison_text(raw: &str) -> Result<&str, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if text.chars().count() < MIN_TEXT_CHARS {
        return Err(ValidationError::TextTooShort {
            min: MIN_TEXT_CHARS,
        });
    }
    Ok(text)
}

/// Validate a classification threshold
pub fn validate_threshold(threshold: f64) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ValidationError::ThresholdOutOfRange(threshold))
    }
}
