//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use crate::kube::WatchSettings;
use crate::view::RenderOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace used when `-n` is not given
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Watch behaviour
    #[serde(default)]
    pub watch: WatchConfig,

    /// What the rendered view includes
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchConfig {
    /// Errors in a row before a watch gives up
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Seconds to wait before retrying a failed watch
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Fetch a resource once when its watch gives up
    #[serde(default = "default_true")]
    pub fetch_fallback: bool,

    /// Seconds between release re-fetches (0 disables)
    #[serde(default = "default_release_refresh_secs")]
    pub release_refresh_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// List resources that are not watched
    #[serde(default = "default_true")]
    pub show_static: bool,

    /// Print the release notes
    #[serde(default = "default_true")]
    pub show_notes: bool,
}

// Default value functions
fn default_namespace() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    1
}

fn default_release_refresh_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            watch: WatchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: default_max_consecutive_errors(),
            retry_delay_secs: default_retry_delay_secs(),
            fetch_fallback: default_true(),
            release_refresh_secs: default_release_refresh_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_static: default_true(),
            show_notes: default_true(),
        }
    }
}

impl Config {
    /// Retry policy handed to the watch transport
    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            max_consecutive_errors: self.watch.max_consecutive_errors,
            retry_delay: Duration::from_secs(self.watch.retry_delay_secs),
            fetch_fallback: self.watch.fetch_fallback,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_static: self.output.show_static,
            show_notes: self.output.show_notes,
        }
    }

    /// Release polling interval, `None` when polling is off
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.watch.release_refresh_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Check values that parse but make no sense
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_namespace.trim().is_empty() {
            anyhow::bail!("defaultNamespace must not be empty");
        }
        if self.watch.max_consecutive_errors == 0 {
            anyhow::bail!("watch.maxConsecutiveErrors must be at least 1");
        }
        Ok(())
    }
}
