use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Name the upstream certificate is verified against. Falls back to `host`.
    #[serde(default)]
    pub tls_server_name: Option<String>,

    /// PEM bundle of trusted roots for the upstream certificate.
    #[serde(default)]
    pub cert_path: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Bound on one write+read exchange after the handshake, in seconds. 0 disables it.
    #[serde(default = "default_exchange_timeout")]
    pub exchange_timeout: u64,
}

impl UpstreamConfig {
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn server_name(&self) -> &str {
        self.tls_server_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.host)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn exchange_timeout(&self) -> Option<Duration> {
        (self.exchange_timeout > 0).then(|| Duration::from_secs(self.exchange_timeout))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls_server_name: None,
            cert_path: String::new(),
            connect_timeout: default_connect_timeout(),
            exchange_timeout: default_exchange_timeout(),
        }
    }
}

fn default_host() -> String {
    "1.1.1.1".to_string()
}

fn default_port() -> u16 {
    853
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_exchange_timeout() -> u64 {
    10
}
