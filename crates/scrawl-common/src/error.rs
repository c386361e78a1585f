//! Common error types for Scrawl components.

use thiserror::Error;

/// Result alias used throughout the distortion pipeline
pub type Result<T, E = ScrawlError> = std::result::Result<T, E>;

/// Errors that abort a single CAPTCHA generation
#[derive(Debug, Error)]
pub enum ScrawlError {
    /// Invalid input/parameters (bad dimensions, empty text, too few points)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Font file missing, unreadable, or not a font
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Output format unsupported or encoder failure
    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    /// Configuration source could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrawlError {
    /// Returns the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) => 2,
            Self::ResourceUnavailable(_) => 3,
            Self::EncodingFailure(_) => 4,
            Self::Config(_) => 78,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            ScrawlError::InvalidInput(String::new()).exit_code(),
            ScrawlError::ResourceUnavailable(String::new()).exit_code(),
            ScrawlError::EncodingFailure(String::new()).exit_code(),
            ScrawlError::Config(String::new()).exit_code(),
        ];

        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            assert!(codes[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ScrawlError::ResourceUnavailable("fonts/missing.ttf".to_string());
        assert_eq!(err.to_string(), "Resource unavailable: fonts/missing.ttf");
    }
}
