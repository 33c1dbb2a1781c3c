use dot_proxy_domain::ServerConfig;
use dot_proxy_infrastructure::dns::{DnsServerHandler, TcpFrontend, UdpFrontend};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::signal::wait_for_shutdown;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs both listeners until a termination signal, then cancels `shutdown`
/// and waits up to `SHUTDOWN_GRACE` for in-flight requests.
pub async fn start_dns_server(
    config: &ServerConfig,
    handler: DnsServerHandler,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = config.listen_addr().parse()?;

    let tcp = TcpFrontend::bind(socket_addr)?.with_idle_timeout(config.tcp_idle_timeout());
    let udp = UdpFrontend::bind(socket_addr)?.with_buffer_size(config.udp_buffer_size);

    let mut listeners = JoinSet::new();
    listeners.spawn(tcp.run(handler.clone(), shutdown.clone()));
    listeners.spawn(udp.run(handler, shutdown.clone()));

    info!(bind_address = %socket_addr, "DNS server ready");

    tokio::select! {
        signal = wait_for_shutdown() => signal?,
        _ = listeners.join_next() => warn!("A DNS listener exited unexpectedly"),
    }

    shutdown.cancel();

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while listeners.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "Listeners did not stop within the grace period, aborting"
        );
        listeners.abort_all();
    }

    Ok(())
}
