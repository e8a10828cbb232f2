pub mod connection;
pub mod generators;

pub use connection::{ConnectOptions, ConnectionError, Result, ServerClient, StubClient};
pub use generators::{mixed_pattern_payload, random_payload, KeyGenerator};
