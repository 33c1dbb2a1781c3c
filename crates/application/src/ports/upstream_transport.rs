use async_trait::async_trait;
use dot_proxy_domain::DomainError;
use tokio_util::sync::CancellationToken;

/// One request/response exchange with the DNS-over-TLS resolver.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Sends a packed query and returns the packed answer.
    ///
    /// Must return `DomainError::Cancelled` once `cancel` fires, releasing any
    /// connection it opened; a partial answer is never returned.
    async fn exchange(
        &self,
        request: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, DomainError>;

    /// Human-readable upstream identity for logs.
    fn upstream_name(&self) -> &str;
}
