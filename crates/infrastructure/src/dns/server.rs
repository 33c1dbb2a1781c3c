mod handler;
mod tcp;
mod udp;

pub use handler::DnsServerHandler;
pub use tcp::TcpFrontend;
pub use udp::UdpFrontend;

use dot_proxy_domain::DomainError;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

fn new_socket(addr: SocketAddr, ty: Type, protocol: Protocol) -> Result<Socket, DomainError> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, ty, Some(protocol)).map_err(|e| bind_error(addr, e))?;
    if addr.is_ipv6() {
        socket.set_only_v6(false).map_err(|e| bind_error(addr, e))?;
    }
    socket
        .set_reuse_address(true)
        .map_err(|e| bind_error(addr, e))?;
    socket
        .bind(&addr.into())
        .map_err(|e| bind_error(addr, e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| bind_error(addr, e))?;

    Ok(socket)
}

fn bind_error(addr: SocketAddr, e: std::io::Error) -> DomainError {
    DomainError::Io(format!("Failed to bind {}: {}", addr, e))
}
