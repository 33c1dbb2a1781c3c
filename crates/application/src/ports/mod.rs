mod cache_store;
mod upstream_transport;

pub use cache_store::CacheStore;
pub use upstream_transport::UpstreamTransport;
