//! Ported from `hset_benchmark_large.py`. 80 small hash tables plus one
//! large one, warmed up with `hset` calls and then exercised with random
//! field updates.

use std::sync::Mutex;

use rand::Rng;
use valkey_load_client::{random_payload, ServerClient};
use valkey_load_worker::CustomCommand;

const NUM_SMALL_HASHES: u64 = 80;
const FIELDS_PER_SMALL_HASH: u64 = 100_000;
const FIELDS_PER_LARGE_HASH: u64 = 1_000_000;
const FIELD_VALUE_SIZE: usize = 1000;
const FIELD_BATCH: u64 = 1000;

struct WarmupState {
    current_hash: u64,
    completed: bool,
}

pub struct HsetBenchmarkLarge {
    total_hashes: u64,
    large_hash_id: u64,
    fields_per_small_hash: u64,
    fields_per_large_hash: u64,
    warmup_mode: bool,
    state: Mutex<WarmupState>,
}

impl HsetBenchmarkLarge {
    pub fn new() -> Self {
        Self {
            total_hashes: NUM_SMALL_HASHES + 1,
            large_hash_id: NUM_SMALL_HASHES,
            fields_per_small_hash: FIELDS_PER_SMALL_HASH,
            fields_per_large_hash: FIELDS_PER_LARGE_HASH,
            warmup_mode: std::env::var("HSET_WARMUP_MODE").map(|v| v == "1").unwrap_or(false),
            state: Mutex::new(WarmupState { current_hash: 0, completed: false }),
        }
    }

    fn fields_for_hash(&self, hash_id: u64) -> u64 {
        if hash_id == self.large_hash_id { self.fields_per_large_hash } else { self.fields_per_small_hash }
    }

    fn warmup_hash(&self, client: &mut dyn ServerClient, hash_id: u64) -> bool {
        let key = format!("hash:{hash_id}");
        let total_fields = self.fields_for_hash(hash_id);
        let mut field_start = 0u64;
        while field_start < total_fields {
            let mut fields = std::collections::HashMap::new();
            let batch_end = (field_start + FIELD_BATCH).min(total_fields);
            for field_id in field_start..batch_end {
                fields.insert(format!("field:{field_id}"), random_payload(FIELD_VALUE_SIZE));
            }
            if client.hset(&key, &fields).is_err() {
                return false;
            }
            field_start = batch_end;
        }
        true
    }

    fn execute_warmup(&self, client: &mut dyn ServerClient) -> bool {
        let mut state = self.state.lock().expect("hset_benchmark_large warmup state poisoned");
        if state.completed {
            return true;
        }
        let hash_id = state.current_hash;
        if !self.warmup_hash(client, hash_id) {
            return false;
        }
        state.current_hash += 1;
        if state.current_hash >= self.total_hashes {
            state.completed = true;
        }
        true
    }

    fn execute_benchmark(&self, client: &mut dyn ServerClient) -> bool {
        let mut rng = rand::thread_rng();
        let hash_id = rng.gen_range(0..self.total_hashes);
        let field_id = rng.gen_range(0..self.fields_for_hash(hash_id));
        let key = format!("hash:{hash_id}");
        let field = format!("field:{field_id}");
        let mut fields = std::collections::HashMap::new();
        fields.insert(field, random_payload(FIELD_VALUE_SIZE));
        client.hset(&key, &fields).is_ok()
    }
}

impl Default for HsetBenchmarkLarge {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomCommand for HsetBenchmarkLarge {
    fn execute(&self, client: &mut dyn ServerClient) -> bool {
        if self.warmup_mode {
            self.execute_warmup(client)
        } else {
            self.execute_benchmark(client)
        }
    }
}
