pub mod tls;

pub use tls::TlsTransport;
