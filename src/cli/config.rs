//! Configuration subcommands

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::{CONFIG_KEYS, ConfigLoader, get_config_value, paths, set_config_value};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "defaultNamespace", "watch.fetchFallback")
        key: Option<String>,
        /// Kubeconfig context whose overrides apply
        #[arg(long)]
        context: Option<String>,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "defaultNamespace", "watch.fetchFallback")
        key: String,
        /// Configuration value
        value: String,
        /// Save to the file for this kubeconfig context instead of the root file
        #[arg(long)]
        context: Option<String>,
    },
    /// List all configuration keys with their effective values
    List {
        #[arg(long)]
        context: Option<String>,
    },
    /// Show configuration file path
    Path {
        #[arg(long)]
        context: Option<String>,
    },
    /// Validate configuration
    Validate {
        #[arg(long)]
        context: Option<String>,
    },
}

/// Handle configuration subcommands
pub fn handle_config_command(cmd: ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key, context } => {
            let config =
                ConfigLoader::load(context.as_deref()).context("Failed to load configuration")?;

            if let Some(key) = key {
                println!("{}", get_config_value(&config, &key)?);
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Set {
            key,
            value,
            context,
        } => {
            let path = match context.as_deref() {
                Some(ctx) => paths::context_config_path(ctx),
                None => paths::root_config_path(),
            };

            // Only the target file is edited, never the merged result
            let mut config = if path.exists() {
                ConfigLoader::load_file(&path)?
            } else {
                ConfigLoader::load_defaults()
            };

            set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {} = {}", key, value))?;

            ConfigLoader::save(&config, &path).context("Failed to save configuration")?;
            println!("Configuration saved to {}", path.display());
        }
        ConfigSubcommand::List { context } => {
            let config =
                ConfigLoader::load(context.as_deref()).context("Failed to load configuration")?;
            for key in CONFIG_KEYS {
                println!("{} = {}", key, get_config_value(&config, key)?);
            }
        }
        ConfigSubcommand::Path { context } => match context.as_deref() {
            Some(ctx) => println!("{}", paths::context_config_path(ctx).display()),
            None => println!("{}", paths::root_config_path().display()),
        },
        ConfigSubcommand::Validate { context } => {
            ConfigLoader::validate(context.as_deref())
                .context("Configuration validation failed")?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
