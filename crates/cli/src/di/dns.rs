use dot_proxy_application::ports::CacheStore;
use dot_proxy_application::services::ResponseCache;
use dot_proxy_application::use_cases::ForwardDnsQueryUseCase;
use dot_proxy_domain::Config;
use dot_proxy_infrastructure::cache::RedisCacheStore;
use dot_proxy_infrastructure::dns::{CertificateStore, DnsServerHandler, TlsTransport};
use std::sync::Arc;
use tracing::info;

pub struct DnsServices {
    pub handler: DnsServerHandler,
}

impl DnsServices {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let certificates = Arc::new(CertificateStore::new(&config.upstream.cert_path));
        let transport = Arc::new(TlsTransport::from_config(&config.upstream, certificates)?);
        info!(
            upstream = %config.upstream.address(),
            server_name = %config.upstream.server_name(),
            "Upstream DNS-over-TLS resolver configured"
        );

        let store = Arc::new(RedisCacheStore::connect(&config.cache).await?);
        store.ping().await?;

        let cache = Arc::new(ResponseCache::new(store).with_ttl(config.cache.ttl()));
        info!(
            address = %config.cache.url(),
            ttl_secs = cache.ttl().as_secs(),
            "Response cache ready"
        );

        let use_case = Arc::new(ForwardDnsQueryUseCase::new(transport, cache));

        Ok(Self {
            handler: DnsServerHandler::new(use_case),
        })
    }
}
