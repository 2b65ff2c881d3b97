//! Configuration error types

use thiserror::Error;

/// Errors raised while loading configuration from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set but cannot be parsed
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    /// An environment variable holds a malformed URL
    #[error("invalid URL in {0}: {1}")]
    InvalidUrl(String, String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_variable() {
        let err = ConfigError::MissingEnvVar("SPOTIFY_CLIENT_ID".to_string());
        assert!(err.to_string().contains("SPOTIFY_CLIENT_ID"));

        let err = ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string(), "abc".to_string());
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
        assert!(err.to_string().contains("abc"));
    }
}
