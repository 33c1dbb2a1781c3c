mod config;
mod logging;

pub use config::{check_certificates, load_config, warn_if_certificates_unreadable};
pub use logging::init_logging;
