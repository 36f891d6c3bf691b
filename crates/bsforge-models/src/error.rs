//! Error types for model validation.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while constructing or validating model values.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Invalid word timestamp for '{word}': start={start}, end={end}")]
    InvalidWordTimestamp { word: String, start: f64, end: f64 },

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

impl ModelError {
    /// Create an invalid word timestamp error.
    pub fn invalid_word(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self::InvalidWordTimestamp {
            word: word.into(),
            start,
            end,
        }
    }

    /// Create an invalid color error.
    pub fn invalid_color(value: impl Into<String>) -> Self {
        Self::InvalidColor(value.into())
    }
}
