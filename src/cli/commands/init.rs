//! Init and Config commands.

use anyhow::Result;

use crate::config::Settings;

/// Run init command - create configuration file in the current directory.
pub fn run_init(force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let path = Settings::init_config_file(&current_dir, force)?;

    println!("Created configuration file at: {}", path.display());
    println!("Edit the [[indexes]] sections to choose what gets indexed.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
