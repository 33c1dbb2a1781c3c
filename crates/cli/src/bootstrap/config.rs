use anyhow::Context;
use dot_proxy_domain::{CliOverrides, Config};
use dot_proxy_infrastructure::dns::load_trusted_roots;
use std::path::Path;
use tracing::warn;

/// Loads and validates configuration. Runs before logging is set up, so
/// failures surface through the returned error only.
pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides).context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Returns the number of trusted roots in the bundle.
pub fn check_certificates(config: &Config) -> anyhow::Result<usize> {
    let roots = load_trusted_roots(Path::new(&config.upstream.cert_path))?;
    Ok(roots.len())
}

/// The bundle is read lazily on the first upstream exchange; this only
/// reports a problem early.
pub fn warn_if_certificates_unreadable(config: &Config) {
    if let Err(e) = load_trusted_roots(Path::new(&config.upstream.cert_path)) {
        warn!(
            path = %config.upstream.cert_path,
            error = %e,
            "Upstream certificate bundle is not usable yet; queries will fail until it is"
        );
    }
}
