mod cache_key_codec;
mod response_cache;

pub use cache_key_codec::CacheKeyCodec;
pub use response_cache::{ResponseCache, DEFAULT_RESPONSE_TTL};
