use super::handler::{log_dropped, DnsServerHandler};
use super::new_socket;
use crate::dns::framing::{read_framed, write_framed};
use dot_proxy_domain::DomainError;
use socket2::{Protocol, Type};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LISTEN_BACKLOG: i32 = 1024;
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Length-prefixed DNS over TCP. One query per connection: read, answer, close.
pub struct TcpFrontend {
    listener: TcpListener,
    idle_timeout: Option<Duration>,
}

impl TcpFrontend {
    pub fn bind(addr: SocketAddr) -> Result<Self, DomainError> {
        let socket = new_socket(addr, Type::STREAM, Protocol::TCP)?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| DomainError::Io(format!("Failed to listen on {}: {}", addr, e)))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| DomainError::Io(format!("Failed to register listener {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            idle_timeout: None,
        })
    }

    /// Limit on how long a client may take to send its query.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.listener
            .local_addr()
            .map_err(|e| DomainError::Io(e.to_string()))
    }

    /// Accepts until `shutdown` fires, then waits for in-flight connections,
    /// which observe the same signal.
    pub async fn run(self, handler: DnsServerHandler, shutdown: CancellationToken) {
        let local_addr = self.local_addr().ok();
        info!(bind_address = ?local_addr, "TCP listener started");

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            handler.clone(),
                            shutdown.child_token(),
                            self.idle_timeout,
                        ));
                    }
                    Err(e) => pause_after_accept_error(&e).await,
                },
            }
        }

        drop(self.listener);
        while connections.join_next().await.is_some() {}
        info!(bind_address = ?local_addr, "TCP listener stopped");
    }
}

/// Accept errors such as EMFILE tend to repeat until a descriptor frees up.
async fn pause_after_accept_error(err: &std::io::Error) {
    warn!(error = %err, backoff_ms = ACCEPT_ERROR_BACKOFF.as_millis() as u64, "TCP accept failed");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: DnsServerHandler,
    cancel: CancellationToken,
    idle_timeout: Option<Duration>,
) {
    let read = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        read = read_query(&mut stream, idle_timeout) => read,
    };

    let query = match read {
        Ok(query) => query,
        Err(e) => {
            debug!(client = %peer, error = %e, "Closing TCP connection without a query");
            return;
        }
    };

    match handler.handle_raw(&query, peer, &cancel).await {
        Ok(response) => {
            if let Err(e) = write_framed(&mut stream, &response).await {
                warn!(client = %peer, error = %e, "Failed to write TCP response");
                return;
            }
            let _ = stream.shutdown().await;
        }
        Err(e) => log_dropped("tcp", peer, &e),
    }
}

async fn read_query(
    stream: &mut TcpStream,
    idle_timeout: Option<Duration>,
) -> Result<Vec<u8>, DomainError> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, read_framed(stream))
            .await
            .map_err(|_| DomainError::Io(format!("No query within {:?}", limit)))?,
        None => read_framed(stream).await,
    }
}
