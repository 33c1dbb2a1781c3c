use clap::Parser;
use dot_proxy_domain::CliOverrides;
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "dot-proxy")]
#[command(version)]
#[command(about = "DNS proxy forwarding plaintext TCP/UDP queries to a DNS-over-TLS resolver")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Upstream DNS-over-TLS resolver host
    #[arg(long, env = "DNS_OVER_TLS_HOST")]
    upstream_host: Option<String>,

    /// Upstream DNS-over-TLS resolver port
    #[arg(long, env = "DNS_OVER_TLS_PORT")]
    upstream_port: Option<u16>,

    /// Name the upstream certificate must match (defaults to the host)
    #[arg(long)]
    tls_server_name: Option<String>,

    /// PEM bundle of CA certificates trusted for the upstream
    #[arg(long, env = "DNS_OVER_TLS_CERT_PATH", value_name = "FILE")]
    cert_path: Option<String>,

    /// Redis host used as the answer cache
    #[arg(long, env = "REDIS_HOST")]
    redis_host: Option<String>,

    /// Redis port
    #[arg(long, env = "REDIS_PORT")]
    redis_port: Option<u16>,

    /// DNS listen port (TCP and UDP)
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Validate configuration and the certificate bundle, then exit
    #[arg(long)]
    check_config: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            upstream_host: self.upstream_host.clone(),
            upstream_port: self.upstream_port,
            tls_server_name: self.tls_server_name.clone(),
            cert_path: self.cert_path.clone(),
            cache_host: self.redis_host.clone(),
            cache_port: self.redis_port,
            dns_port: self.dns_port,
            bind_address: self.bind.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(cli.config.as_deref(), cli.overrides())?;
    bootstrap::init_logging(&config.logging)?;

    if cli.check_config {
        let certificates = bootstrap::check_certificates(&config)?;
        info!(certificates, "Configuration is valid");
        return Ok(());
    }

    info!("Starting dot-proxy v{}", env!("CARGO_PKG_VERSION"));
    bootstrap::warn_if_certificates_unreadable(&config);

    let services = match di::DnsServices::new(&config).await {
        Ok(services) => services,
        Err(e) => {
            error!(error = %e, "Failed to initialise services");
            return Err(e);
        }
    };

    let shutdown = CancellationToken::new();
    if let Err(e) = server::start_dns_server(&config.server, services.handler, shutdown).await {
        error!(error = %e, "DNS server error");
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}
