use std::collections::HashMap;
use std::fmt;

pub type Result<T> = std::result::Result<T, ConnectionError>;

/// An error surfaced by a server-protocol client. The message text is the
/// only thing the rest of the crate inspects — `ErrorClass::classify`
/// looks for "MOVED"/"CLUSTERDOWN" substrings in it.
#[derive(Debug, Clone)]
pub struct ConnectionError(pub String);

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConnectionError {}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub addresses: Vec<(String, u16)>,
    pub use_tls: bool,
    pub read_from_replica: bool,
    pub request_timeout_ms: Option<u64>,
    pub is_cluster: bool,
}

/// A server-protocol connection, kept as a trait so the worker engine and
/// rate controller never depend on a concrete network client — this is the
/// only seam across which a real client implementation is swapped in.
/// Errors surface by their message text; `connect`/`set`/`get`/`hset`/
/// `hget`/`mset` each fail the same way a real driver call fails, and the
/// caller classifies the message rather than matching on error variants.
pub trait ServerClient: Send {
    fn connect(opts: &ConnectOptions) -> Result<Self>
    where
        Self: Sized;

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>>;
    fn hset(&mut self, key: &str, fields: &HashMap<String, Vec<u8>>) -> Result<()>;
    fn hget(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;
    fn mset(&mut self, entries: &HashMap<String, Vec<u8>>) -> Result<()>;
    fn close(&mut self);
}

/// In-memory `ServerClient` used by tests and the demo custom commands.
/// Never talks to a network; `connect` always succeeds.
#[derive(Debug, Default)]
pub struct StubClient {
    store: HashMap<String, Vec<u8>>,
    hashes: HashMap<String, HashMap<String, Vec<u8>>>,
    closed: bool,
}

impl ServerClient for StubClient {
    fn connect(_opts: &ConnectOptions) -> Result<Self> {
        Ok(Self::default())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.store.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.get(key).cloned())
    }

    fn hset(&mut self, key: &str, fields: &HashMap<String, Vec<u8>>) -> Result<()> {
        self.hashes.entry(key.to_string()).or_default().extend(fields.clone());
        Ok(())
    }

    fn hget(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    fn mset(&mut self, entries: &HashMap<String, Vec<u8>>) -> Result<()> {
        self.store.extend(entries.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

impl StubClient {
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ConnectOptions {
        ConnectOptions {
            addresses: vec![("127.0.0.1".into(), 6379)],
            use_tls: false,
            read_from_replica: false,
            request_timeout_ms: None,
            is_cluster: false,
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut c = StubClient::connect(&opts()).unwrap();
        c.set("k", b"v").unwrap();
        assert_eq!(c.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn get_missing_key_is_none() {
        let mut c = StubClient::connect(&opts()).unwrap();
        assert_eq!(c.get("missing").unwrap(), None);
    }

    #[test]
    fn hset_then_hget_round_trips() {
        let mut c = StubClient::connect(&opts()).unwrap();
        let mut fields = HashMap::new();
        fields.insert("f".to_string(), b"v".to_vec());
        c.hset("h", &fields).unwrap();
        assert_eq!(c.hget("h", "f").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn close_marks_closed() {
        let mut c = StubClient::connect(&opts()).unwrap();
        assert!(!c.is_closed());
        c.close();
        assert!(c.is_closed());
    }
}
