//! Config command - show, locate and create the configuration file.

use std::path::Path;

use anyhow::{Context, Result, bail};
use cornbelt_core::{Config, ConfigError};

use crate::cli::ConfigAction;

/// Execute the config command.
pub fn cmd_config(action: ConfigAction, config: &Config, path: &Path, database: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            println!("# {}", path.display());
            println!("# database: {}", database.display());
            print!("{}", content);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Configuration already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default()
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Validate => match config.validate() {
            Ok(()) => println!("Configuration is valid"),
            Err(ConfigError::Validation(errors)) => {
                for error in &errors {
                    println!("  {}", error);
                }
                bail!("{} configuration error(s)", errors.len());
            }
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}
