//! DNS-over-TLS proxy domain layer
pub mod cache_key;
pub mod config;
pub mod errors;

pub use cache_key::CacheKey;
pub use config::{
    CacheConfig, CliOverrides, Config, ConfigError, LogFormat, LoggingConfig, ServerConfig,
    UpstreamConfig,
};
pub use errors::DomainError;
