//! DNS-over-TLS proxy application layer: ports, cache services and the forwarding use case.
pub mod ports;
pub mod services;
pub mod use_cases;
