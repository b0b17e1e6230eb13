//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules. Layers are merged key by key, so a context
//! file only has to mention the values it changes.

use super::{paths, schema::Config};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Context-specific config
    /// 3. Root config
    /// 4. Built-in defaults
    pub fn load(context: Option<&str>) -> Result<Config> {
        let mut layers = vec![paths::root_config_path()];
        if let Some(context_name) = context {
            layers.push(paths::context_config_path(context_name));
        }
        Self::load_layers(&layers, |key| std::env::var(key).ok())
    }

    /// Merge `layers` over the defaults, apply env overrides and validate
    fn load_layers(
        layers: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Config> {
        let mut merged = serde_yaml::to_value(Self::load_defaults())
            .context("Failed to serialize default configuration")?;

        for path in layers {
            if let Some(layer) = Self::load_layer(path)? {
                tracing::debug!("Merging config layer {}", path.display());
                merge_values(&mut merged, layer);
            }
        }

        let config: Config =
            serde_yaml::from_value(merged).context("Failed to build merged configuration")?;
        let config = Self::apply_env_overrides(config, env);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Load configuration from a single file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Raw YAML of one layer; `None` when the file does not exist
    fn load_layer(path: &Path) -> Result<Option<Value>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: Value = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    /// Validate every existing layer and the merged result
    pub fn validate(context: Option<&str>) -> Result<()> {
        let mut layers = vec![paths::root_config_path()];
        if let Some(context_name) = context {
            layers.push(paths::context_config_path(context_name));
        }

        for path in layers.iter().filter(|p| p.exists()) {
            Self::load_file(path)?
                .validate()
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        }

        Self::load(context)
            .context("Failed to load merged configuration")?
            .validate()
    }

    /// Built-in defaults, the lowest layer
    pub fn load_defaults() -> Config {
        Config::default()
    }

    /// Apply environment variable overrides
    ///
    /// Values that do not parse, or that would not validate, are ignored.
    fn apply_env_overrides(mut config: Config, env: impl Fn(&str) -> Option<String>) -> Config {
        if let Some(namespace) = env("RELWATCH_DEFAULT_NAMESPACE") {
            if namespace.trim().is_empty() {
                tracing::warn!("Ignoring empty RELWATCH_DEFAULT_NAMESPACE");
            } else {
                config.default_namespace = namespace;
            }
        }

        if let Some(max) = env("RELWATCH_MAX_WATCH_ERRORS") {
            match max.parse() {
                Ok(val) if val > 0 => config.watch.max_consecutive_errors = val,
                _ => tracing::warn!("Ignoring RELWATCH_MAX_WATCH_ERRORS={}", max),
            }
        }

        if let Some(secs) = env("RELWATCH_REFRESH_SECS") {
            match secs.parse() {
                Ok(val) => config.watch.release_refresh_secs = val,
                Err(_) => tracing::warn!("Ignoring RELWATCH_REFRESH_SECS={}", secs),
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }

    /// Save context-specific configuration
    pub fn save_context(config: &Config, context: &str) -> Result<()> {
        Self::save(config, &paths::context_config_path(context))
    }
}

/// Deep-merge `overlay` into `base`; mappings merge per key, anything else
/// replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
