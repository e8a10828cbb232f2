use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use valkey_load_core::KeyspaceMode;

/// Picks the key for each dispatched request, by the same precedence order
/// as `KeyspaceMode`: sequential beats random beats the per-task default.
pub struct KeyGenerator {
    mode: KeyspaceMode,
    /// Random starting offset for sequential mode, drawn once per worker.
    offset: u64,
}

impl KeyGenerator {
    pub fn new(mode: KeyspaceMode) -> Self {
        let offset = match mode {
            KeyspaceMode::Sequential { len, random_start: true } if len > 0 => {
                rand::thread_rng().gen_range(0..len)
            }
            _ => 0,
        };
        Self { mode, offset }
    }

    pub fn key(&self, thread_id: usize, requests_completed: u64) -> String {
        match self.mode {
            KeyspaceMode::Sequential { len, .. } => {
                format!("key:{}", (self.offset + requests_completed) % len.max(1))
            }
            KeyspaceMode::Random { size } => {
                let idx = rand::thread_rng().gen_range(0..size.max(1));
                format!("key:{idx}")
            }
            KeyspaceMode::Default => format!("key:{thread_id}:{requests_completed}"),
        }
    }
}

/// `size` bytes drawn from the OS CSPRNG. Used for the non-compressible SET
/// payload shape.
pub fn random_payload(size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; size];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// `size` bytes where the leading ~70% are zero and the remainder is random
/// — the mixed-pattern payload shape some command programs use instead of
/// fully non-compressible data.
pub fn mixed_pattern_payload(size: usize) -> Vec<u8> {
    let zero_len = (size as f64 * 0.7).round() as usize;
    let zero_len = zero_len.min(size);
    let mut buf = vec![0u8; size];
    OsRng.fill_bytes(&mut buf[zero_len..]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_wraps_around_keyspace_length() {
        let gen = KeyGenerator::new(KeyspaceMode::Sequential { len: 3, random_start: false });
        assert_eq!(gen.key(0, 0), "key:0");
        assert_eq!(gen.key(0, 3), "key:0");
        assert_eq!(gen.key(0, 4), "key:1");
    }

    #[test]
    fn sequential_random_start_offsets_consistently() {
        let gen = KeyGenerator::new(KeyspaceMode::Sequential { len: 1000, random_start: true });
        let a = gen.key(0, 0);
        let b = gen.key(0, 0);
        assert_eq!(a, b, "same generator instance must be deterministic across calls with the same counter");
    }

    #[test]
    fn random_keyspace_stays_in_bounds() {
        let gen = KeyGenerator::new(KeyspaceMode::Random { size: 10 });
        for i in 0..50 {
            let key = gen.key(0, i);
            let idx: u64 = key.strip_prefix("key:").unwrap().parse().unwrap();
            assert!(idx < 10);
        }
    }

    #[test]
    fn default_mode_embeds_thread_id_and_counter() {
        let gen = KeyGenerator::new(KeyspaceMode::Default);
        assert_eq!(gen.key(2, 7), "key:2:7");
    }

    #[test]
    fn random_payload_has_exact_size() {
        assert_eq!(random_payload(128).len(), 128);
    }

    #[test]
    fn mixed_pattern_payload_leading_bytes_are_zero() {
        let payload = mixed_pattern_payload(100);
        assert_eq!(payload.len(), 100);
        assert!(payload[..70].iter().all(|&b| b == 0));
    }
}
