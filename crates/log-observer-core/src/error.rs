//! Error types for Log Observer

use thiserror::Error;

/// Result type alias using Log Observer's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Log Observer operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connection refused, timeout, bad body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },

    /// Backend answered 2xx but reported an application error
    #[error("{0}")]
    Api(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Terminal setup or drawing error
    #[error("Terminal error: {0}")]
    Tui(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an error for a non-2xx response
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Create an application-level error reported by the backend
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure came from the network or the backend, as opposed to local state
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::Api(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = Error::status(503, "Service Unavailable");
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
        assert!(err.is_remote());
    }

    #[test]
    fn test_api_error_is_bare_message() {
        let err = Error::api("Database not connected");
        assert_eq!(err.to_string(), "Database not connected");
    }

    #[test]
    fn test_local_errors_are_not_remote() {
        assert!(!Error::validation("bad").is_remote());
        assert!(!Error::config("missing").is_remote());
    }
}
