//! Reconciliation engine for one release
//!
//! `AppSession` owns the watch connection manager, the aggregate state and
//! the last accepted manifest snapshot of a single Helm release. Presentation
//! code drives it through a handful of triggers and reads `view()` after
//! every change.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{ParseError, RefreshError, ReleaseFetchError};
use crate::kube::{
    ClusterConnection, HelmReleaseFetcher, KubeResourceFetcher, KubeWatchTransport,
    ReleaseFetcher, WatchSettings,
};
use crate::manifest::{parse_manifest, select_targets};
use crate::models::{ManifestSnapshot, Release, ReleaseRef};
use crate::view::AppView;
use crate::watcher::{
    AggregateState, ReconcileOutcome, StateEvent, WatchConnectionManager, WatchMessage,
    WatchTransport, reduce,
};

/// A live view of one release
///
/// # Example
///
/// ```rust,no_run
/// use relwatch::kube::{WatchSettings, connect};
/// use relwatch::models::ReleaseRef;
/// use relwatch::services::AppSession;
///
/// # async fn example() -> anyhow::Result<()> {
/// let cluster = connect(None).await?;
/// let mut session = AppSession::connect(
///     &cluster,
///     ReleaseRef::new("blog", "web"),
///     WatchSettings::default(),
/// );
///
/// session.refresh().await?;
/// while let Some(message) = session.recv_event().await {
///     if session.handle_message(message) {
///         println!("{:?}", session.view());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct AppSession {
    release_ref: ReleaseRef,
    fetcher: Arc<dyn ReleaseFetcher>,
    manager: WatchConnectionManager,
    event_rx: mpsc::UnboundedReceiver<WatchMessage>,
    state: AggregateState,
    snapshot: Option<ManifestSnapshot>,
    release: Option<Release>,
    error: Option<String>,
}

impl AppSession {
    pub fn new(
        release_ref: ReleaseRef,
        fetcher: Arc<dyn ReleaseFetcher>,
        transport: Arc<dyn WatchTransport>,
    ) -> Self {
        let (manager, event_rx) = WatchConnectionManager::new(transport);
        Self {
            release_ref,
            fetcher,
            manager,
            event_rx,
            state: AggregateState::new(),
            snapshot: None,
            release: None,
            error: None,
        }
    }

    /// Session backed by the cluster: Helm Secret storage for the release and
    /// kube-rs watches for its resources
    pub fn connect(
        cluster: &ClusterConnection,
        release_ref: ReleaseRef,
        settings: WatchSettings,
    ) -> Self {
        let fetcher = Arc::new(HelmReleaseFetcher::new(cluster.client.clone()));
        let transport = Arc::new(KubeWatchTransport::new(
            cluster.client.clone(),
            cluster.cluster_url.clone(),
            settings,
            Arc::new(KubeResourceFetcher::new(cluster.client.clone())),
        ));
        Self::new(release_ref, fetcher, transport)
    }

    /// Fetch the release and reconcile its manifest
    ///
    /// A failed fetch tears every watch down and puts the view into its
    /// error state.
    pub async fn refresh(&mut self) -> Result<ReconcileOutcome, RefreshError> {
        let name = self.release_ref.name.clone();
        let namespace = self.release_ref.namespace.clone();
        tracing::debug!("Fetching release {}/{}", namespace, name);

        match self.fetcher.get_release(&name, &namespace).await {
            Ok(release) => Ok(self.on_manifest_received(release)?),
            Err(err) => {
                self.on_error(&err);
                Err(err.into())
            }
        }
    }

    /// Accept a (possibly unchanged) release
    ///
    /// An unchanged manifest performs no reconcile unless a watch stopped on
    /// its own and has to be reopened. A manifest that does not parse leaves
    /// the current snapshot, watches and state as they are, except that a
    /// release with a different identity always tears the old one down first.
    pub fn on_manifest_received(
        &mut self,
        release: Release,
    ) -> Result<ReconcileOutcome, ParseError> {
        let release_ref = release.release_ref();
        if release_ref != self.release_ref {
            tracing::debug!("Release changed to {}, tearing down", release_ref);
            self.teardown();
            self.release = None;
            self.error = None;
            self.release_ref = release_ref.clone();
        }

        let snapshot = parse_manifest(&release.manifest, &release_ref)?;

        self.error = None;
        self.release = Some(release);

        if self.snapshot.as_ref() == Some(&snapshot) && !self.manager.has_stopped() {
            tracing::debug!("Manifest of {} unchanged", self.release_ref);
            return Ok(ReconcileOutcome::default());
        }

        let partition = select_targets(&snapshot);
        let outcome = self.manager.reconcile(&partition.watchable);

        self.apply(StateEvent::SnapshotAccepted {
            watchable: partition.watchable,
            statics: partition.statics,
            retain: outcome.retained_keys(),
        });
        for (target, error) in &outcome.failed {
            self.apply(StateEvent::TransportFailed {
                kind: target.kind.clone(),
                name: target.name.clone(),
                error: error.clone(),
            });
        }

        tracing::info!(
            "Accepted manifest for {}: {} resources, {} watches opened, {} closed",
            self.release_ref,
            snapshot.len(),
            outcome.opened.len(),
            outcome.closed.len()
        );
        self.snapshot = Some(snapshot);
        Ok(outcome)
    }

    /// The release could not be loaded: close everything and show the error
    pub fn on_error(&mut self, err: &ReleaseFetchError) {
        tracing::warn!("Release {} failed: {}", self.release_ref, err);
        self.teardown();
        self.release = None;
        self.error = Some(err.to_string());
    }

    /// Switch to the same release in another namespace
    pub async fn on_namespace_changed(
        &mut self,
        namespace: impl Into<String>,
    ) -> Result<ReconcileOutcome, RefreshError> {
        let namespace = namespace.into();
        if namespace != self.release_ref.namespace {
            tracing::debug!(
                "Namespace changed from {} to {}",
                self.release_ref.namespace,
                namespace
            );
            self.teardown();
            self.release = None;
            self.error = None;
            self.release_ref.namespace = namespace;
        }
        self.refresh().await
    }

    /// Close every watch; returns how many were open
    pub fn on_unmount(&mut self) -> usize {
        let closed = self.teardown();
        tracing::debug!("Unmounted {}, closed {} watches", self.release_ref, closed);
        closed
    }

    fn teardown(&mut self) -> usize {
        let closed = self.manager.close_all();
        self.apply(StateEvent::Reset);
        self.snapshot = None;
        closed
    }

    fn apply(&mut self, event: StateEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    /// Apply one message from a watch
    ///
    /// Returns false when the message changed nothing (stale handle,
    /// malformed payload or a connection reporting that it stopped).
    pub fn handle_message(&mut self, message: WatchMessage) -> bool {
        match self.manager.on_message(message) {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply every message already waiting; returns how many were applied
    pub fn drain_events(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(message) = self.event_rx.try_recv() {
            if self.handle_message(message) {
                changed += 1;
            }
        }
        changed
    }

    /// Wait for the next message from any watch
    pub async fn recv_event(&mut self) -> Option<WatchMessage> {
        self.event_rx.recv().await
    }

    /// Current view model
    pub fn view(&self) -> AppView {
        if let Some(message) = &self.error {
            return AppView::failed(message.clone());
        }
        match &self.release {
            Some(release) => AppView::project(release, &self.state),
            None => AppView::Loading,
        }
    }

    pub fn release_ref(&self) -> &ReleaseRef {
        &self.release_ref
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&ManifestSnapshot> {
        self.snapshot.as_ref()
    }

    /// Keys with an open watch, sorted
    pub fn watched_keys(&self) -> Vec<String> {
        self.manager.watched_keys()
    }
}
