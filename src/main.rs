//! relwatch - live view of a Helm release's resources
//!
//! Fetches a release from the cluster, opens one Kubernetes watch per
//! Deployment, Service, Ingress and Secret of its manifest, and prints the
//! resulting view every time something changes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use relwatch::cli::{self, ConfigSubcommand, ManifestArgs, WatchArgs};

#[derive(Parser, Debug)]
#[command(name = "relwatch")]
#[command(about = "Live view of a Helm release's resources", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Watch a release and print its view on every change
    Watch(WatchArgs),
    /// Show how a manifest would be watched, without a cluster
    Manifest(ManifestArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    match args.command {
        Command::Watch(watch) => cli::run_watch(watch).await,
        Command::Manifest(manifest) => cli::run_manifest(manifest),
        Command::Config { subcommand } => cli::handle_config_command(subcommand),
        Command::Version => {
            cli::display_version();
            Ok(())
        }
    }
}
