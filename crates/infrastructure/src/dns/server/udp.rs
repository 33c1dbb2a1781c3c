use super::handler::{log_dropped, DnsServerHandler};
use super::new_socket;
use dot_proxy_domain::config::server::DEFAULT_UDP_BUFFER_SIZE;
use dot_proxy_domain::DomainError;
use socket2::{Protocol, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One DNS message per datagram. Datagrams longer than the receive buffer
/// arrive cut short and fail to unpack.
pub struct UdpFrontend {
    socket: Arc<UdpSocket>,
    buffer_size: usize,
}

impl UdpFrontend {
    pub fn bind(addr: SocketAddr) -> Result<Self, DomainError> {
        let socket = new_socket(addr, Type::DGRAM, Protocol::UDP)?;
        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)
            .map_err(|e| DomainError::Io(format!("Failed to register socket {}: {}", addr, e)))?;

        Ok(Self {
            socket: Arc::new(socket),
            buffer_size: DEFAULT_UDP_BUFFER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.socket
            .local_addr()
            .map_err(|e| DomainError::Io(e.to_string()))
    }

    pub async fn run(self, handler: DnsServerHandler, shutdown: CancellationToken) {
        let local_addr = self.local_addr().ok();
        info!(bind_address = ?local_addr, buffer_size = self.buffer_size, "UDP listener started");

        let mut recv_buf = vec![0u8; self.buffer_size];
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                received = self.socket.recv_from(&mut recv_buf) => match received {
                    Ok((len, peer)) => {
                        let datagram = recv_buf[..len].to_vec();
                        let socket = self.socket.clone();
                        let handler = handler.clone();
                        let cancel = shutdown.child_token();
                        in_flight.spawn(async move {
                            match handler.handle_raw(&datagram, peer, &cancel).await {
                                Ok(response) => {
                                    if let Err(e) = socket.send_to(&response, peer).await {
                                        warn!(client = %peer, error = %e, "Failed to send UDP response");
                                    }
                                }
                                Err(e) => log_dropped("udp", peer, &e),
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "UDP recv error"),
                },
            }
        }

        while in_flight.join_next().await.is_some() {}
        info!(bind_address = ?local_addr, "UDP listener stopped");
    }
}
