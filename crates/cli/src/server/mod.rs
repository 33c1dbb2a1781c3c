mod dns;
mod signal;

pub use dns::start_dns_server;
