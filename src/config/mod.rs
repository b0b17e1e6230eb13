//! Configuration system for relwatch
//!
//! Layered YAML configuration: built-in defaults, a root file, an optional
//! file per kubeconfig context, then environment overrides.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, OutputConfig, WatchConfig};

/// Every key `config get`/`config set` understands
pub const CONFIG_KEYS: [&str; 7] = [
    "defaultNamespace",
    "watch.maxConsecutiveErrors",
    "watch.retryDelaySecs",
    "watch.fetchFallback",
    "watch.releaseRefreshSecs",
    "output.showStatic",
    "output.showNotes",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "defaultNamespace" => Ok(config.default_namespace.clone()),
        "watch.maxConsecutiveErrors" => Ok(config.watch.max_consecutive_errors.to_string()),
        "watch.retryDelaySecs" => Ok(config.watch.retry_delay_secs.to_string()),
        "watch.fetchFallback" => Ok(config.watch.fetch_fallback.to_string()),
        "watch.releaseRefreshSecs" => Ok(config.watch.release_refresh_secs.to_string()),
        "output.showStatic" => Ok(config.output.show_static.to_string()),
        "output.showNotes" => Ok(config.output.show_notes.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    match key {
        "defaultNamespace" => {
            config.default_namespace = value.to_string();
        }
        "watch.maxConsecutiveErrors" => {
            config.watch.max_consecutive_errors = value
                .parse()
                .context("watch.maxConsecutiveErrors must be a number")?;
        }
        "watch.retryDelaySecs" => {
            config.watch.retry_delay_secs = value
                .parse()
                .context("watch.retryDelaySecs must be a number")?;
        }
        "watch.fetchFallback" => {
            config.watch.fetch_fallback = value
                .parse()
                .context("watch.fetchFallback must be 'true' or 'false'")?;
        }
        "watch.releaseRefreshSecs" => {
            config.watch.release_refresh_secs = value
                .parse()
                .context("watch.releaseRefreshSecs must be a number")?;
        }
        "output.showStatic" => {
            config.output.show_static = value
                .parse()
                .context("output.showStatic must be 'true' or 'false'")?;
        }
        "output.showNotes" => {
            config.output.show_notes = value
                .parse()
                .context("output.showNotes must be 'true' or 'false'")?;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_round_trips_through_get() {
        let config = Config::default();
        for key in CONFIG_KEYS {
            assert!(get_config_value(&config, key).is_ok(), "{}", key);
        }
        assert!(get_config_value(&config, "ui.skin").is_err());
    }

    #[test]
    fn test_set_config_value() {
        let mut config = Config::default();
        set_config_value(&mut config, "watch.releaseRefreshSecs", "0").unwrap();
        set_config_value(&mut config, "output.showNotes", "false").unwrap();
        assert_eq!(config.refresh_interval(), None);
        assert!(!config.output.show_notes);

        assert!(set_config_value(&mut config, "watch.fetchFallback", "maybe").is_err());
        assert!(set_config_value(&mut config, "watch.maxConsecutiveErrors", "0").is_err());
        assert!(set_config_value(&mut config, "nope", "1").is_err());
    }
}
