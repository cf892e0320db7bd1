//! Error types for fragbits-core.
//!
//! Fingerprint, codec, and similarity failures carry their own focused error
//! enums next to the code that raises them; [`CoreError`] covers the shared
//! concerns, currently configuration loading and validation.

use thiserror::Error;

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is invalid or could not be loaded.
    ///
    /// # When This Occurs
    ///
    /// - Missing or unreadable configuration file
    /// - Invalid value format in a file or environment variable
    /// - A validated field out of range (e.g. a cutoff outside `[0, 1]`)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::ConfigError("cutoff out of range".to_string());
        assert!(err.to_string().contains("cutoff out of range"));
    }
}
