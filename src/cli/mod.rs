//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod config;
mod logging;
mod version;
mod watch;

pub use config::{ConfigSubcommand, handle_config_command};
pub use logging::*;
pub use version::display_version;
pub use watch::{ManifestArgs, WatchArgs, run_manifest, run_watch};
