use std::collections::HashMap;

use valkey_load_client::ServerClient;
use valkey_load_core::{BenchError, Result};

/// A user-supplied command program. Replaces the inline SET/GET branch in
/// the dispatch loop when `Command::Custom` is selected.
pub trait CustomCommand: Send + Sync {
    fn execute(&self, client: &mut dyn ServerClient) -> bool;
}

pub type CustomCommandConstructor = fn(&str) -> Box<dyn CustomCommand>;

/// Rust-idiomatic substitute for dynamic module loading: a name to
/// constructor table, populated at startup rather than resolved by
/// importing an arbitrary file at runtime.
#[derive(Default)]
pub struct CustomCommandRegistry {
    entries: HashMap<String, CustomCommandConstructor>,
}

impl CustomCommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, ctor: CustomCommandConstructor) {
        self.entries.insert(name.to_string(), ctor);
    }

    pub fn build(&self, name: &str, args: &str) -> Result<Box<dyn CustomCommand>> {
        let ctor = self.entries.get(name).ok_or_else(|| BenchError::UnknownCustomCommand(name.to_string()))?;
        Ok(ctor(args))
    }
}

/// Resolves a `--custom-command-file` value against the registry. The value
/// is treated as a path whose file stem names the registered program — the
/// loader never actually opens a file on disk.
pub fn load_custom_command(
    registry: &CustomCommandRegistry,
    path_or_name: &str,
    args: &str,
) -> Result<Box<dyn CustomCommand>> {
    let name = std::path::Path::new(path_or_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path_or_name);
    registry.build(name, args).map_err(|_| BenchError::CustomCommandFileNotFound(path_or_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use valkey_load_client::StubClient;

    struct AlwaysSucceeds;
    impl CustomCommand for AlwaysSucceeds {
        fn execute(&self, _client: &mut dyn ServerClient) -> bool {
            true
        }
    }

    fn build_always_succeeds(_args: &str) -> Box<dyn CustomCommand> {
        Box::new(AlwaysSucceeds)
    }

    #[test]
    fn registered_command_builds_and_executes() {
        let mut registry = CustomCommandRegistry::new();
        registry.register("demo", build_always_succeeds);
        let cmd = load_custom_command(&registry, "/path/to/demo.py", "warmup").unwrap();
        let mut client = StubClient::default();
        assert!(cmd.execute(&mut client));
    }

    #[test]
    fn unregistered_command_is_an_error() {
        let registry = CustomCommandRegistry::new();
        assert!(matches!(
            load_custom_command(&registry, "/path/to/missing.py", ""),
            Err(BenchError::CustomCommandFileNotFound(_))
        ));
    }
}
