use valkey_load_core::{Command, Config, Result};
use valkey_load_worker::{load_custom_command, CustomCommand, CustomCommandRegistry};

/// Builds the custom command this run should dispatch, if any. The
/// registry only knows about the demo programs shipped in
/// `valkey-load-demos`; a real deployment would register its own plug-ins
/// the same way.
pub fn build_custom_command(config: &Config) -> Result<Option<Box<dyn CustomCommand>>> {
    if config.command != Command::Custom {
        return Ok(None);
    }
    let mut registry = CustomCommandRegistry::new();
    valkey_load_demos::register_demo_commands(&mut registry);

    let path = config.custom_command_file.as_deref().expect("validated: custom requires a file");
    let args = config.custom_command_args.as_deref().unwrap_or("");
    Ok(Some(load_custom_command(&registry, path, args)?))
}
