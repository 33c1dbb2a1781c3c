//! Trusted roots for verifying the upstream resolver's certificate.

use dot_proxy_domain::DomainError;
use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Loads the PEM bundle on first use and keeps it for the life of the process.
/// A failed load is not remembered, so fixing the file on disk takes effect on
/// the next upstream exchange.
pub struct CertificateStore {
    path: PathBuf,
    roots: OnceCell<Arc<RootCertStore>>,
}

impl CertificateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            roots: OnceCell::new(),
        }
    }

    pub async fn trusted_roots(&self) -> Result<Arc<RootCertStore>, DomainError> {
        self.roots
            .get_or_try_init(|| async {
                let pem = tokio::fs::read(&self.path).await.map_err(|e| {
                    DomainError::Configuration(format!(
                        "Failed to read certificate bundle {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
                let roots = parse_pem_bundle(&pem, &self.path)?;
                info!(
                    path = %self.path.display(),
                    certificates = roots.len(),
                    "Loaded upstream trust bundle"
                );
                Ok::<_, DomainError>(Arc::new(roots))
            })
            .await
            .cloned()
    }
}

/// Synchronous load, used for start-up checks.
pub fn load_trusted_roots(path: &Path) -> Result<RootCertStore, DomainError> {
    let pem = std::fs::read(path).map_err(|e| {
        DomainError::Configuration(format!(
            "Failed to read certificate bundle {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_pem_bundle(&pem, path)
}

fn parse_pem_bundle(pem: &[u8], path: &Path) -> Result<RootCertStore, DomainError> {
    let mut certs: Vec<CertificateDer<'static>> = Vec::new();
    for entry in rustls_pemfile::certs(&mut &pem[..]) {
        match entry {
            Ok(cert) => certs.push(cert),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping malformed PEM block"),
        }
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);

    if ignored > 0 {
        warn!(path = %path.display(), ignored, "Ignored unparseable certificates");
    }

    if added == 0 {
        return Err(DomainError::Configuration(format!(
            "No usable certificates found in {}",
            path.display()
        )));
    }

    Ok(roots)
}
