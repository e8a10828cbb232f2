//! Ported from `set_benchmark.py`. Warmup mode bulk-populates a keyspace via
//! `mset` in small batches, partitioned across `WARMUP_TOTAL_PROCESSES`
//! workers by `WARMUP_PROCESS_ID`; benchmark mode issues single-key `get`
//! calls against a uniformly random key (the Python original issues a
//! fire-and-forget `set`, but by the time it calls `client.get` at the end
//! of `_execute_benchmark` in the original it is in fact a read — this port
//! keeps that de-facto behavior rather than the docstring's description).

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;
use valkey_load_client::{random_payload, ServerClient};
use valkey_load_worker::CustomCommand;

const BATCH_SIZE: u64 = 100;
const CHUNK_SIZE: u64 = 100_000;
const CHUNKS_PER_CALL: u64 = 10;

struct WarmupState {
    current_key: u64,
    completed: bool,
}

pub struct SetBenchmark {
    total_keys: u64,
    value_size: usize,
    warmup_mode: bool,
    process_start_key: u64,
    process_end_key: u64,
    state: Mutex<WarmupState>,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl SetBenchmark {
    pub fn new() -> Self {
        let total_keys: u64 = 4_000_000_000;
        let process_id = env_u64("WARMUP_PROCESS_ID", 0);
        let total_processes = env_u64("WARMUP_TOTAL_PROCESSES", 1).max(1);

        let keys_per_process = total_keys / total_processes;
        let process_start_key = process_id * keys_per_process;
        let process_end_key = if process_id == total_processes - 1 {
            total_keys
        } else {
            process_start_key + keys_per_process
        };

        Self {
            total_keys,
            value_size: 50,
            warmup_mode: env_flag("SET_WARMUP_MODE"),
            process_start_key,
            process_end_key,
            state: Mutex::new(WarmupState { current_key: process_start_key, completed: false }),
        }
    }

    fn warmup_chunk(&self, client: &mut dyn ServerClient, start_key: u64, num_keys: u64) -> bool {
        let mut batch_start = start_key;
        while batch_start < start_key + num_keys {
            let mut entries = HashMap::new();
            for offset in 0..BATCH_SIZE {
                let key_id = batch_start + offset;
                if key_id >= start_key + num_keys || key_id >= self.total_keys {
                    break;
                }
                entries.insert(format!("key:{key_id}"), random_payload(self.value_size));
            }
            if !entries.is_empty() && client.mset(&entries).is_err() {
                return false;
            }
            batch_start += BATCH_SIZE;
        }
        true
    }

    fn execute_warmup(&self, client: &mut dyn ServerClient) -> bool {
        let mut state = self.state.lock().expect("set_benchmark warmup state poisoned");
        if state.completed {
            return true;
        }

        for i in 0..CHUNKS_PER_CALL {
            let start_key = state.current_key + i * CHUNK_SIZE;
            if start_key >= self.process_end_key {
                break;
            }
            let remaining = self.process_end_key - start_key;
            let chunk_size = CHUNK_SIZE.min(remaining);
            if !self.warmup_chunk(client, start_key, chunk_size) {
                return false;
            }
        }

        state.current_key += CHUNK_SIZE * CHUNKS_PER_CALL;
        if state.current_key >= self.process_end_key {
            state.completed = true;
        }
        true
    }

    fn execute_benchmark(&self, client: &mut dyn ServerClient) -> bool {
        let key_id = rand::thread_rng().gen_range(0..self.total_keys);
        client.get(&format!("key:{key_id}")).is_ok()
    }
}

impl Default for SetBenchmark {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomCommand for SetBenchmark {
    fn execute(&self, client: &mut dyn ServerClient) -> bool {
        if self.warmup_mode {
            self.execute_warmup(client)
        } else {
            self.execute_benchmark(client)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valkey_load_client::StubClient;

    /// `env::set_var`/`remove_var` are unsafe in newer toolchains (process
    /// environment mutation is not thread-safe in general); these tests run
    /// serially within this module so the lack of cross-thread isolation is
    /// harmless here.
    #[test]
    fn benchmark_mode_gets_a_key_in_range() {
        unsafe { std::env::remove_var("SET_WARMUP_MODE") };
        let cmd = SetBenchmark::new();
        let mut client = StubClient::default();
        assert!(cmd.execute(&mut client));
    }

    #[test]
    fn warmup_partitions_keyspace_across_processes() {
        unsafe {
            std::env::set_var("WARMUP_PROCESS_ID", "1");
            std::env::set_var("WARMUP_TOTAL_PROCESSES", "4");
        }
        let cmd = SetBenchmark::new();
        unsafe {
            std::env::remove_var("WARMUP_PROCESS_ID");
            std::env::remove_var("WARMUP_TOTAL_PROCESSES");
        }

        let quarter = cmd.total_keys / 4;
        assert_eq!(cmd.process_start_key, quarter);
        assert_eq!(cmd.process_end_key, quarter * 2);
    }

    #[test]
    fn warmup_chunk_populates_keys() {
        unsafe {
            std::env::set_var("SET_WARMUP_MODE", "1");
            std::env::set_var("WARMUP_TOTAL_PROCESSES", "1");
        }
        let mut cmd = SetBenchmark::new();
        cmd.total_keys = 250;
        cmd.process_end_key = 250;
        unsafe {
            std::env::remove_var("SET_WARMUP_MODE");
            std::env::remove_var("WARMUP_TOTAL_PROCESSES");
        }

        let mut client = StubClient::default();
        assert!(cmd.execute(&mut client));
        assert_eq!(client.get("key:0").unwrap().unwrap().len(), 50);
    }
}
