use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest datagram the UDP front-end accepts; anything longer is truncated by the socket.
pub const DEFAULT_UDP_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_dns_port")]
    pub dns_port: u16,

    #[serde(default = "default_udp_buffer_size")]
    pub udp_buffer_size: usize,

    /// Seconds a TCP client may take to deliver its query. 0 disables the limit.
    #[serde(default = "default_tcp_idle_timeout")]
    pub tcp_idle_timeout: u64,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        if self.bind_address.contains(':') {
            format!("[{}]:{}", self.bind_address, self.dns_port)
        } else {
            format!("{}:{}", self.bind_address, self.dns_port)
        }
    }

    pub fn tcp_idle_timeout(&self) -> Option<Duration> {
        (self.tcp_idle_timeout > 0).then(|| Duration::from_secs(self.tcp_idle_timeout))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            dns_port: default_dns_port(),
            udp_buffer_size: default_udp_buffer_size(),
            tcp_idle_timeout: default_tcp_idle_timeout(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_dns_port() -> u16 {
    53
}

fn default_udp_buffer_size() -> usize {
    DEFAULT_UDP_BUFFER_SIZE
}

fn default_tcp_idle_timeout() -> u64 {
    10
}
