pub mod certificates;
pub mod framing;
pub mod server;
pub mod transport;

pub use certificates::{load_trusted_roots, CertificateStore};
pub use server::{DnsServerHandler, TcpFrontend, UdpFrontend};
pub use transport::TlsTransport;
