pub mod dns;

pub use dns::ForwardDnsQueryUseCase;
