use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed DNS message: {0}")]
    Codec(String),

    #[error("Upstream exchange failed: {0}")]
    Upstream(String),

    #[error("Transport timeout connecting to {server}")]
    UpstreamTimeout { server: String },

    #[error("Cache store error: {0}")]
    Cache(String),

    #[error("Request cancelled by shutdown")]
    Cancelled,

    #[error("Upstream exchange deadline exceeded")]
    DeadlineExceeded,

    #[error("I/O error: {0}")]
    Io(String),
}

impl DomainError {
    /// Cache failures are absorbed by the forwarding path and never reach a front-end.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Self::Cache(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<ConfigError> for DomainError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
