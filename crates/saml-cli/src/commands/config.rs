//! Configuration management commands.

use crate::cli::ConfigCommand;
use crate::CliConfig;

/// Runs a config command.
pub fn run_config(cmd: ConfigCommand, config: &CliConfig) -> crate::CliResult<()> {
    let shown = match cmd {
        ConfigCommand::Show => config.clone(),
        ConfigCommand::Defaults => CliConfig::default(),
    };
    print!("{}", shown.to_toml()?);
    Ok(())
}
