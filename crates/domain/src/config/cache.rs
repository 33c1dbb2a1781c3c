use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a cached upstream answer, in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u64,
}

impl CacheConfig {
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("redis://[{}]:{}/", self.host, self.port)
        } else {
            format!("redis://{}:{}/", self.host, self.port)
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            ttl: default_ttl(),
        }
    }
}

fn default_port() -> u16 {
    6379
}

fn default_ttl() -> u64 {
    30 * 60
}
