use async_trait::async_trait;
use dot_proxy_application::ports::CacheStore;
use dot_proxy_domain::{CacheKey, DomainError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// In-process stand-in for Redis.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    unreachable: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        let store = Self::new();
        store.unreachable.store(true, Ordering::SeqCst);
        store
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    fn check_reachable(&self) -> Result<(), DomainError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(DomainError::Cache("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn ping(&self) -> Result<(), DomainError> {
        self.check_reachable()
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, DomainError> {
        self.check_reachable()?;
        Ok(self.entries.read().unwrap().get(key.as_str()).cloned())
    }

    async fn set(&self, key: &CacheKey, value: &[u8], _ttl: Duration) -> Result<(), DomainError> {
        self.check_reachable()?;
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
