pub mod cache;
pub mod dns;
