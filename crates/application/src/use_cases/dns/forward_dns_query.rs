use crate::ports::UpstreamTransport;
use crate::services::{CacheKeyCodec, ResponseCache};
use dot_proxy_domain::{CacheKey, DomainError};
use hickory_proto::op::{Message, MessageType, OpCode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Answers one client query: cache first, then the DNS-over-TLS upstream.
pub struct ForwardDnsQueryUseCase {
    transport: Arc<dyn UpstreamTransport>,
    cache: Arc<ResponseCache>,
    key_codec: CacheKeyCodec,
}

impl ForwardDnsQueryUseCase {
    pub fn new(transport: Arc<dyn UpstreamTransport>, cache: Arc<ResponseCache>) -> Self {
        Self {
            transport,
            cache,
            key_codec: CacheKeyCodec::new(),
        }
    }

    /// Returns the packed response. Its ID always equals `query.id()`.
    pub async fn execute(
        &self,
        query: &Message,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, DomainError> {
        if query.queries().is_empty() {
            return Err(DomainError::Codec("Query has no question section".to_string()));
        }

        let mut upstream_request = Self::build_upstream_request(query);

        // The key must not depend on the transaction ID, so it is derived
        // before the upstream request gets one.
        let cache_key = match self.key_codec.derive_key(query.queries()) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Failed to derive cache key, continuing without cache");
                None
            }
        };

        if let Some(key) = &cache_key {
            if let Some(cached) = self.lookup_cached(key, query).await? {
                return Ok(cached);
            }
        }

        upstream_request.set_id(query.id());
        let packed_request = upstream_request
            .to_vec()
            .map_err(|e| DomainError::Codec(format!("Failed to pack upstream query: {}", e)))?;

        let raw_response = self.transport.exchange(&packed_request, cancel).await?;
        let packed_response = Self::normalize_response(&raw_response, query.id())?;

        if let Some(key) = &cache_key {
            self.cache.store(key, &raw_response).await;
        }

        debug!(
            id = query.id(),
            upstream = self.transport.upstream_name(),
            response_len = packed_response.len(),
            "Upstream answer forwarded"
        );

        Ok(packed_response)
    }

    fn build_upstream_request(query: &Message) -> Message {
        let mut request = Message::new();
        request
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_queries(query.queries().to_vec());
        request
    }

    async fn lookup_cached(
        &self,
        key: &CacheKey,
        query: &Message,
    ) -> Result<Option<Vec<u8>>, DomainError> {
        match self.cache.lookup(key, query.id()).await {
            Ok(Some(cached)) => {
                info!(question = %query.queries()[0], cache_key = %key, "Cache hit");
                Ok(Some(cached))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_cache_error() => {
                warn!(cache_key = %key, error = %e, "Cache lookup failed, forwarding upstream");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Decodes the upstream answer and re-packs it under the client's ID.
    fn normalize_response(raw: &[u8], id: u16) -> Result<Vec<u8>, DomainError> {
        let mut response = Message::from_vec(raw)
            .map_err(|e| DomainError::Codec(format!("Malformed upstream response: {}", e)))?;

        if response.id() != id {
            warn!(
                expected = id,
                received = response.id(),
                "Upstream answered with a different transaction ID"
            );
            response.set_id(id);
        }

        response
            .to_vec()
            .map_err(|e| DomainError::Codec(format!("Failed to pack response: {}", e)))
    }
}
