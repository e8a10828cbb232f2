use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use valkey_load_client::StubClient;
use valkey_load_core::Config;
use valkey_load_metrics::Message;
use valkey_load_worker::WorkerEngine;

use crate::custom;

/// Entry point for a spawned worker subprocess (recognized by
/// `WORKER_ENV_VAR` in the child's environment). Reads its `(worker_id,
/// Config)` plan as one JSON line on stdin, runs a [`WorkerEngine`], and
/// emits every metrics [`Message`] it produces as one JSON line per message
/// on stdout. The orchestrator's per-child reader thread is the other end
/// of both pipes.
///
/// The orchestrator signals shutdown by closing its handle to this
/// process's stdin; a background thread here keeps reading stdin to EOF
/// and flips the engine's shutdown flag the moment that happens, so the
/// cooperative "checked once per request" contract in spec §5 holds even
/// though the signal crossed a process boundary.
pub fn run() -> i32 {
    let mut first_line = String::new();
    match io::stdin().lock().read_line(&mut first_line) {
        Ok(0) | Err(_) => {
            eprintln!("error: worker process got no configuration on stdin");
            return 1;
        }
        Ok(_) => {}
    }

    let (worker_id, config): (usize, Config) = match serde_json::from_str(first_line.trim()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: failed to parse worker configuration: {e}");
            return 1;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            let mut lock = stdin.lock();
            let mut discard = String::new();
            loop {
                discard.clear();
                match lock.read_line(&mut discard) {
                    Ok(0) | Err(_) => {
                        shutdown.store(true, Ordering::SeqCst);
                        return;
                    }
                    Ok(_) => continue,
                }
            }
        });
    }

    let custom_command = match custom::build_custom_command(&config) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let engine = match WorkerEngine::<StubClient>::new(config, worker_id, shutdown, custom_command) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let stdout = io::stdout();
    let sink = move |msg: Message| {
        if let Ok(line) = serde_json::to_string(&msg) {
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{line}");
            let _ = handle.flush();
        }
    };

    engine.run(&sink);
    0
}
