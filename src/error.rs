//! Error types for the hodlr application.

use thiserror::Error;

/// The main error type for hodlr.
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal/TUI related errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the market data API or the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Managed backend errors that are not HTTP failures
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel communication errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The acting user lacks a permission
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Invalid input or state
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Content rejected by the moderation filter
    #[error("Content rejected: contains {}", .0.join(", "))]
    Moderation(Vec<String>),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limiting errors
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    /// Operation not offered by the configured backend
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Generic application error
    #[error("{0}")]
    Application(String),
}

/// Alias for Result with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new terminal error.
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a new API error from a status code and body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a new backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a new auth error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a new permission error.
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Create a new validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new unsupported-operation error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new application error.
    pub fn application(msg: impl Into<String>) -> Self {
        Self::Application(msg.into())
    }

    /// Check if this error is recoverable (user can retry).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) | Self::Channel(_) | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_message_lists_terms() {
        let err = Error::Moderation(vec!["damn".to_string(), "shit".to_string()]);
        assert_eq!(err.to_string(), "Content rejected: contains damn, shit");
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::network("down").is_recoverable());
        assert!(Error::RateLimited(30).is_recoverable());
        assert!(Error::api(503, "unavailable").is_recoverable());
        assert!(!Error::api(404, "missing").is_recoverable());
        assert!(!Error::validation("empty").is_recoverable());
    }
}
