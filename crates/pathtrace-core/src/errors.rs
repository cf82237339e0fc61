//! Error type for trace transitions and configuration
//!
//! Trace misuse is reported synchronously to the caller. Nothing here is
//! retried: an instrumentation utility either records the transition or
//! tells the caller why it could not.

/// Unified error type for pathtrace operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    /// A section name was empty
    #[error("Invalid section name: name is not allowed to be zero length")]
    EmptyName,

    /// An operation that needs an innermost segment ran on the root state
    #[error("Empty path: `{operation}` requires at least one entered section")]
    EmptyPath {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl TraceError {
    /// Create an empty-path error for the given operation
    pub fn empty_path(operation: &'static str) -> Self {
        Self::EmptyPath { operation }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Standard Result type for pathtrace operations
pub type Result<T> = std::result::Result<T, TraceError>;

impl From<std::io::Error> for TraceError {
    fn from(err: std::io::Error) -> Self {
        Self::config(format!("failed to read config file: {err}"))
    }
}

impl From<toml::de::Error> for TraceError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("invalid TOML: {err}"))
    }
}
