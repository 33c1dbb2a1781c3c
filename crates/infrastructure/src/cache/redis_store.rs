use async_trait::async_trait;
use dot_proxy_application::ports::CacheStore;
use dot_proxy_domain::{CacheConfig, CacheKey, DomainError};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, RedisResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

const CONNECT_RETRIES: usize = 1;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);
/// Upper bound on a whole `connect`, retries included.
const CONNECT_DEADLINE: Duration = Duration::from_secs(5);
/// Upper bound on one command. While Redis is down the connection manager
/// keeps reconnecting in the background; requests must not wait on it.
const COMMAND_TIMEOUT: Duration = Duration::from_millis(500);
const RECONNECT_FACTOR_MS: u64 = 50;
const RECONNECT_MAX_DELAY_MS: u64 = 1_000;

/// Redis-backed answer store. Values are the packed upstream response, written
/// with `SETEX` so Redis expires them.
pub struct RedisCacheStore {
    connection: ConnectionManager,
    address: String,
}

impl RedisCacheStore {
    pub async fn connect(config: &CacheConfig) -> Result<Self, DomainError> {
        let url = config.url();
        let client = redis::Client::open(url.as_str())
            .map_err(|e| DomainError::Cache(format!("Invalid Redis address {}: {}", url, e)))?;

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(CONNECT_RETRIES)
            .set_exponent_base(2)
            .set_factor(RECONNECT_FACTOR_MS)
            .set_max_delay(RECONNECT_MAX_DELAY_MS)
            .set_connection_timeout(CONNECTION_TIMEOUT)
            .set_response_timeout(COMMAND_TIMEOUT);

        let connection = tokio::time::timeout(
            CONNECT_DEADLINE,
            client.get_connection_manager_with_config(manager_config),
        )
        .await
        .map_err(|_| {
            DomainError::Cache(format!(
                "Timed out connecting to Redis at {} after {:?}",
                url, CONNECT_DEADLINE
            ))
        })?
        .map_err(|e| DomainError::Cache(format!("Failed to connect to Redis at {}: {}", url, e)))?;

        let address = format!("{}:{}", config.host, config.port);
        info!(address = %address, "Connected to Redis");

        Ok(Self {
            connection,
            address,
        })
    }

    async fn bounded<T, F>(&self, operation: &str, command: F) -> Result<T, DomainError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(COMMAND_TIMEOUT, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::Cache(format!(
                "Redis {} on {} failed: {}",
                operation, self.address, e
            ))),
            Err(_) => Err(DomainError::Cache(format!(
                "Redis {} on {} timed out after {:?}",
                operation, self.address, COMMAND_TIMEOUT
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        let reply: String = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        debug!(address = %self.address, reply = %reply, "Redis ping");
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, DomainError> {
        let mut conn = self.connection.clone();
        self.bounded("GET", conn.get::<_, Option<Vec<u8>>>(key.as_str()))
            .await
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        self.bounded("SETEX", conn.set_ex::<_, _, ()>(key.as_str(), value, seconds))
            .await
    }
}
