//! DNS-over-TLS transport (RFC 7858)
//!
//! One TLS connection per exchange: connect, handshake, write one framed
//! query, read one framed answer, close. Roots come from the configured PEM
//! bundle rather than the platform store.

use crate::dns::certificates::CertificateStore;
use crate::dns::framing::{read_framed, write_framed};
use async_trait::async_trait;
use dot_proxy_application::ports::UpstreamTransport;
use dot_proxy_domain::{DomainError, UpstreamConfig};
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::OnceCell;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TlsTransport {
    server_addr: String,
    server_name: ServerName<'static>,
    certificates: Arc<CertificateStore>,
    tls_config: OnceCell<Arc<ClientConfig>>,
    connect_timeout: Duration,
    exchange_timeout: Option<Duration>,
}

impl TlsTransport {
    pub fn new(
        server_addr: impl Into<String>,
        server_name: &str,
        certificates: Arc<CertificateStore>,
    ) -> Result<Self, DomainError> {
        let server_name = ServerName::try_from(server_name.to_string()).map_err(|e| {
            DomainError::Configuration(format!("Invalid TLS server name '{}': {}", server_name, e))
        })?;

        Ok(Self {
            server_addr: server_addr.into(),
            server_name,
            certificates,
            tls_config: OnceCell::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            exchange_timeout: None,
        })
    }

    pub fn from_config(
        config: &UpstreamConfig,
        certificates: Arc<CertificateStore>,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(config.address(), config.server_name(), certificates)?
            .with_connect_timeout(config.connect_timeout())
            .with_exchange_timeout(config.exchange_timeout()))
    }

    /// Bounds the TCP connect and, separately, the TLS handshake.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bounds the write+read after the handshake. `None` waits indefinitely.
    pub fn with_exchange_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    async fn client_config(&self) -> Result<Arc<ClientConfig>, DomainError> {
        self.tls_config
            .get_or_try_init(|| async {
                let roots = self.certificates.trusted_roots().await?;
                let config = ClientConfig::builder_with_protocol_versions(&[
                    &rustls::version::TLS13,
                    &rustls::version::TLS12,
                ])
                .with_root_certificates(roots.as_ref().clone())
                .with_no_client_auth();
                Ok::<_, DomainError>(Arc::new(config))
            })
            .await
            .cloned()
    }

    async fn connect(&self) -> Result<TlsStream<TcpStream>, DomainError> {
        let connector = TlsConnector::from(self.client_config().await?);

        let tcp_stream =
            tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.server_addr))
                .await
                .map_err(|_| DomainError::UpstreamTimeout {
                    server: self.server_addr.clone(),
                })?
                .map_err(|e| {
                    DomainError::Upstream(format!(
                        "Connection refused by TLS server {}: {}",
                        self.server_addr, e
                    ))
                })?;

        tcp_stream.set_nodelay(true).map_err(|e| {
            DomainError::Upstream(format!(
                "Failed to set TCP_NODELAY on {}: {}",
                self.server_addr, e
            ))
        })?;

        let tls_stream = tokio::time::timeout(
            self.connect_timeout,
            connector.connect(self.server_name.clone(), tcp_stream),
        )
        .await
        .map_err(|_| DomainError::UpstreamTimeout {
            server: self.server_addr.clone(),
        })?
        .map_err(|e| {
            DomainError::Upstream(format!(
                "TLS handshake failed with {}: {}",
                self.server_addr, e
            ))
        })?;

        debug!(server = %self.server_addr, "TLS connection established");
        Ok(tls_stream)
    }

    async fn round_trip(&self, request: &[u8]) -> Result<Vec<u8>, DomainError> {
        let mut stream = self.connect().await?;

        let exchange = async {
            write_framed(&mut stream, request).await?;
            read_framed(&mut stream).await
        };

        let response = match self.exchange_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| DomainError::DeadlineExceeded)?,
            None => exchange.await,
        }
        .map_err(|e| self.upstream_error(e))?;

        let _ = stream.shutdown().await;

        debug!(
            server = %self.server_addr,
            response_len = response.len(),
            "TLS response received"
        );

        Ok(response)
    }

    fn upstream_error(&self, err: DomainError) -> DomainError {
        match err {
            DomainError::Io(msg) => DomainError::Upstream(format!("{}: {}", self.server_addr, msg)),
            other => other,
        }
    }
}

#[async_trait]
impl UpstreamTransport for TlsTransport {
    async fn exchange(
        &self,
        request: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        // Losing the race drops the in-flight future, which closes the socket.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(server = %self.server_addr, "Upstream exchange cancelled");
                Err(DomainError::Cancelled)
            }
            result = self.round_trip(request) => result,
        }
    }

    fn upstream_name(&self) -> &str {
        &self.server_addr
    }
}
