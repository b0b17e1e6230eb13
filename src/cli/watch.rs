//! `watch` and `manifest` commands

use anyhow::{Context, Result};
use clap::Args;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, Interval};

use crate::config::{Config, ConfigLoader};
use crate::manifest::{TargetPartition, parse_manifest, select_targets};
use crate::models::ReleaseRef;
use crate::services::AppSession;
use crate::view::{AppView, RenderOptions, render_text};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Helm release name
    pub release: String,

    /// Namespace of the release (defaults to defaultNamespace from config)
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Print the first complete view and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Manifest file, or `-` for stdin
    pub file: PathBuf,

    /// Namespace for resources that do not set one
    #[arg(long, short = 'n', default_value = "default")]
    pub namespace: String,
}

/// Watch a release until Ctrl-C
pub async fn run_watch(args: WatchArgs) -> Result<()> {
    let cluster = crate::kube::connect(args.context.as_deref()).await?;
    let config = ConfigLoader::load(Some(&cluster.context)).unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration, using defaults: {:#}", e);
        ConfigLoader::load_defaults()
    });

    let namespace = release_namespace(args.namespace, &config);
    let release_ref = ReleaseRef::new(args.release, namespace);
    tracing::info!(
        "Watching release {} on {} (context {})",
        release_ref,
        cluster.cluster_url,
        cluster.context
    );

    let mut session = AppSession::connect(&cluster, release_ref, config.watch_settings());
    let result = watch_loop(&mut session, &config, args.once).await;

    let closed = session.on_unmount();
    tracing::debug!("Closed {} watches on exit", closed);
    result
}

/// `-n` wins, then `defaultNamespace`; the kubeconfig namespace is not consulted
fn release_namespace(flag: Option<String>, config: &Config) -> String {
    flag.filter(|ns| !ns.trim().is_empty())
        .unwrap_or_else(|| config.default_namespace.clone())
}

async fn watch_loop(session: &mut AppSession, config: &Config, once: bool) -> Result<()> {
    let options = config.render_options();
    let mut printer = ViewPrinter::new(options);
    let mut ticker = config.refresh_interval().map(refresh_interval);

    if let Err(e) = session.refresh().await {
        tracing::warn!("Initial refresh failed: {}", e);
    }
    let view = session.view();
    printer.print(&view);
    if once && is_settled(&view) {
        return finish_once(&view);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::debug!("Interrupted");
                return Ok(());
            }
            message = session.recv_event() => {
                let Some(message) = message else {
                    return Ok(());
                };
                session.handle_message(message);
                session.drain_events();
            }
            _ = next_tick(&mut ticker) => {
                if let Err(e) = session.refresh().await {
                    tracing::warn!("Release refresh failed: {}", e);
                }
            }
        }

        let view = session.view();
        printer.print(&view);
        if once && is_settled(&view) {
            return finish_once(&view);
        }
    }
}

/// First tick one period from now; `interval` would fire immediately
fn refresh_interval(period: Duration) -> Interval {
    tokio::time::interval_at(Instant::now() + period, period)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Nothing left to wait for: failed, or every resource has been heard from
fn is_settled(view: &AppView) -> bool {
    !view.is_loading()
}

fn finish_once(view: &AppView) -> Result<()> {
    match view {
        AppView::Failed { message } => Err(anyhow::anyhow!("{}", message)),
        _ => Ok(()),
    }
}

/// Prints a view only when its text differs from the last one printed
struct ViewPrinter {
    options: RenderOptions,
    last: Option<String>,
}

impl ViewPrinter {
    fn new(options: RenderOptions) -> Self {
        Self {
            options,
            last: None,
        }
    }

    fn print(&mut self, view: &AppView) {
        let text = render_text(view, &self.options);
        if self.last.as_deref() == Some(text.as_str()) {
            return;
        }
        if self.last.is_some() {
            println!("---");
        }
        print!("{}", text);
        self.last = Some(text);
    }
}

/// Parse a manifest offline and print how it would be watched
pub fn run_manifest(args: ManifestArgs) -> Result<()> {
    let text = if args.file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read manifest from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.file)
            .with_context(|| format!("Failed to read manifest: {}", args.file.display()))?
    };

    let release = ReleaseRef::new("manifest", args.namespace);
    let snapshot = parse_manifest(&text, &release)?;
    print!("{}", describe_partition(&select_targets(&snapshot)));
    Ok(())
}

fn describe_partition(partition: &TargetPartition) -> String {
    let mut lines = vec![format!("Watched ({}):", partition.watchable.len())];
    lines.extend(partition.watchable.iter().map(|t| {
        format!("  {}  {}  {}", t.key(), t.api_version, t.namespace)
    }));
    lines.push(format!("Static ({}):", partition.statics.len()));
    lines.extend(partition.statics.keys().map(|key| format!("  {}", key)));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
