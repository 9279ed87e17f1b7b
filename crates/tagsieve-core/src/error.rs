use std::str::Utf8Error;

use thiserror::Error;

/// Errors surfaced at the filtering boundary.
///
/// Unknown tags, unbalanced markup and malformed attributes are never errors;
/// they are handled by omission during the filtering pass.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The value handed to `process` is not text.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] Utf8Error),

    /// A rules document could not be read as a tag -> attributes mapping.
    #[error("invalid rules: {0}")]
    Rules(#[from] serde_json::Error),
}

impl FilterError {
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::InvalidInput(_) => E_INVALID_INPUT,
            FilterError::Rules(_) => E_RULES,
        }
    }
}

pub const E_INVALID_INPUT: &str = "E_INVALID_INPUT";
pub const E_RULES: &str = "E_RULES";
