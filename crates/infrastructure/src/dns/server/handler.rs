use dot_proxy_application::use_cases::ForwardDnsQueryUseCase;
use dot_proxy_domain::DomainError;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shared by both front-ends: unpack one query, forward it, hand back the
/// packed answer. Framing stays with the caller.
#[derive(Clone)]
pub struct DnsServerHandler {
    use_case: Arc<ForwardDnsQueryUseCase>,
}

impl DnsServerHandler {
    pub fn new(use_case: Arc<ForwardDnsQueryUseCase>) -> Self {
        Self { use_case }
    }

    pub async fn handle_raw(
        &self,
        raw: &[u8],
        client: SocketAddr,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, DomainError> {
        let query = Message::from_vec(raw)
            .map_err(|e| DomainError::Codec(format!("Failed to unpack query: {}", e)))?;

        debug!(
            client = %client,
            id = query.id(),
            questions = query.queries().len(),
            "Query received"
        );

        self.use_case.execute(&query, cancel).await
    }
}

/// No reply is sent for a failed request; the client retries on its own timer.
pub(super) fn log_dropped(protocol: &'static str, client: SocketAddr, err: &DomainError) {
    if err.is_cancellation() {
        debug!(protocol, client = %client, error = %err, "Request abandoned");
    } else {
        warn!(protocol, client = %client, error = %err, "Dropping request without response");
    }
}
