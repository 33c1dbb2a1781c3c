use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dot_proxy_domain::{CacheKey, DomainError};
use hickory_proto::op::Query;
use hickory_proto::serialize::binary::BinEncodable;
use sha2::{Digest, Sha256};

/// Derives store keys from the question section of a query.
///
/// The canonical form is the question count (big-endian u16) followed by each
/// question in uncompressed wire format: name labels, type, class. Names keep
/// the letter case they arrived with, so `Example.com` and `example.com` map to
/// different keys. The wire format never changes between releases, so entries
/// written by a previous process stay addressable.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyCodec;

impl CacheKeyCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn derive_key(&self, questions: &[Query]) -> Result<CacheKey, DomainError> {
        let canonical = Self::canonical_bytes(questions)?;
        let digest = Sha256::digest(&canonical);
        Ok(CacheKey::new(STANDARD.encode(digest)))
    }

    fn canonical_bytes(questions: &[Query]) -> Result<Vec<u8>, DomainError> {
        let count = u16::try_from(questions.len()).map_err(|_| {
            DomainError::Codec(format!("Too many questions to key: {}", questions.len()))
        })?;

        let mut buf = Vec::with_capacity(2 + questions.len() * 32);
        buf.extend_from_slice(&count.to_be_bytes());

        for question in questions {
            // Each question gets its own encoder so no compression pointer can
            // refer back into a previous question.
            let encoded = question.to_bytes().map_err(|e| {
                DomainError::Codec(format!("Failed to serialize question {}: {}", question, e))
            })?;
            buf.extend_from_slice(&encoded);
        }

        Ok(buf)
    }
}
