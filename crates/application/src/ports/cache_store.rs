use async_trait::async_trait;
use dot_proxy_domain::{CacheKey, DomainError};
use std::time::Duration;

/// External key-value store. Implementations must tolerate concurrent use
/// from many request tasks without extra locking.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn ping(&self) -> Result<(), DomainError>;

    /// `Ok(None)` is a miss; `Err` means the store itself failed.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, DomainError>;

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), DomainError>;
}
