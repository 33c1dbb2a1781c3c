use crate::ports::CacheStore;
use dot_proxy_domain::{CacheKey, DomainError};
use hickory_proto::op::Message;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(30 * 60);

/// Cache-aside wrapper over the external store. Holds no mutable state.
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_RESPONSE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached answer re-packed under `request_id`.
    ///
    /// A store failure comes back as `DomainError::Cache`; bytes that no longer
    /// decode come back as `DomainError::Codec` instead of a miss.
    pub async fn lookup(
        &self,
        key: &CacheKey,
        request_id: u16,
    ) -> Result<Option<Vec<u8>>, DomainError> {
        let Some(stored) = self.store.get(key).await? else {
            debug!(cache_key = %key, "Cache miss");
            return Ok(None);
        };

        let mut message = Message::from_vec(&stored).map_err(|e| {
            DomainError::Codec(format!("Corrupt cache entry {}: {}", key, e))
        })?;
        message.set_id(request_id);

        let packed = message.to_vec().map_err(|e| {
            DomainError::Codec(format!("Failed to re-pack cache entry {}: {}", key, e))
        })?;

        Ok(Some(packed))
    }

    /// Best-effort write; failures are logged and dropped.
    pub async fn store(&self, key: &CacheKey, response: &[u8]) {
        match self.store.set(key, response, self.ttl).await {
            Ok(()) => {
                debug!(cache_key = %key, bytes = response.len(), ttl_secs = self.ttl.as_secs(), "Cached upstream response");
            }
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Failed to cache response");
            }
        }
    }
}
