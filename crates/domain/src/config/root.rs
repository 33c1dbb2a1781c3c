use serde::{Deserialize, Serialize};
use std::path::Path;

use super::cache::CacheConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::upstream::UpstreamConfig;

const LOCAL_CONFIG_PATH: &str = "dot-proxy.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/dot-proxy/config.toml";
const MAX_UDP_BUFFER_SIZE: usize = 65_535;

/// Main configuration structure for the proxy
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Local listeners (TCP and UDP share one address)
    #[serde(default)]
    pub server: ServerConfig,

    /// DNS-over-TLS resolver every cache miss is forwarded to
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// External key-value store holding packed answers
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. dot-proxy.toml in current directory
    /// 3. /etc/dot-proxy/config.toml
    /// 4. Default configuration
    ///
    /// Command-line (and environment) overrides are applied on top.
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(path) = Self::get_config_path() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(host) = overrides.upstream_host {
            self.upstream.host = host;
        }
        if let Some(port) = overrides.upstream_port {
            self.upstream.port = port;
        }
        if let Some(name) = overrides.tls_server_name {
            self.upstream.tls_server_name = Some(name);
        }
        if let Some(path) = overrides.cert_path {
            self.upstream.cert_path = path;
        }
        if let Some(host) = overrides.cache_host {
            self.cache.host = host;
        }
        if let Some(port) = overrides.cache_port {
            self.cache.port = port;
        }
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration. Missing required values are reported by the
    /// environment variable that supplies them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.port == 0 {
            return Err(required("DNS_OVER_TLS_PORT"));
        }
        if self.upstream.host.trim().is_empty() {
            return Err(required("DNS_OVER_TLS_HOST"));
        }
        if self.upstream.cert_path.trim().is_empty() {
            return Err(required("DNS_OVER_TLS_CERT_PATH"));
        }
        if self.cache.host.trim().is_empty() {
            return Err(required("REDIS_HOST"));
        }
        if self.cache.port == 0 {
            return Err(required("REDIS_PORT"));
        }

        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }
        if self.server.udp_buffer_size == 0 || self.server.udp_buffer_size > MAX_UDP_BUFFER_SIZE {
            return Err(ConfigError::Validation(format!(
                "UDP buffer size must be between 1 and {} bytes",
                MAX_UDP_BUFFER_SIZE
            )));
        }
        if self.upstream.connect_timeout == 0 {
            return Err(ConfigError::Validation(
                "Upstream connect timeout cannot be 0".to_string(),
            ));
        }
        if self.cache.ttl == 0 {
            return Err(ConfigError::Validation("Cache TTL cannot be 0".to_string()));
        }

        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if Path::new(LOCAL_CONFIG_PATH).exists() {
            Some(LOCAL_CONFIG_PATH.to_string())
        } else if Path::new(SYSTEM_CONFIG_PATH).exists() {
            Some(SYSTEM_CONFIG_PATH.to_string())
        } else {
            None
        }
    }
}

fn required(variable: &str) -> ConfigError {
    ConfigError::Validation(format!("{} is required", variable))
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub upstream_host: Option<String>,
    pub upstream_port: Option<u16>,
    pub tls_server_name: Option<String>,
    pub cert_path: Option<String>,
    pub cache_host: Option<String>,
    pub cache_port: Option<u16>,
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}
