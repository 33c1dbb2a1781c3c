#![allow(dead_code, unused_imports)]

mod messages;

pub use messages::{answer_for, first_answer_ip, query_message};
pub use mock_ports::{MockCacheStore, MockUpstreamTransport, UpstreamBehavior};
