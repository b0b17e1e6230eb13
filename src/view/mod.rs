//! View model projection
//!
//! Everything here is derived on demand from an `AggregateState` (plus the
//! release it belongs to) and holds no state of its own. Presentation code
//! renders an `AppView` and nothing else.

mod access;
mod render;
mod status;

pub use access::{access_urls, ingress_urls, service_urls};
pub use render::{RenderOptions, render_text};
pub use status::{ReleaseStatus, deployment_ready, release_status, replica_summary};

use crate::error::TransportError;
use crate::models::{Release, ReleaseRef, ResourceDescriptor, ResourceKind};
use crate::watcher::{AggregateState, EntryState};
use serde_json::Value;
use std::collections::BTreeMap;

/// Render-ready state of one watchable kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindView {
    /// Loaded payloads in discovery order
    pub items: Vec<Value>,
    /// True iff some entry of this kind has not been loaded yet
    pub loading: bool,
    /// First error among the entries of this kind
    pub error: Option<TransportError>,
}

/// Project one kind out of the aggregate state
///
/// A kind with no entries is not loading and has no items.
pub fn project_kind(state: &AggregateState, kind: &ResourceKind) -> KindView {
    let mut view = KindView::default();
    for entry in state.entries(kind) {
        match &entry.state {
            EntryState::Pending => view.loading = true,
            EntryState::Loaded(payload) => view.items.push(payload.clone()),
            EntryState::Errored(err) => {
                if view.error.is_none() {
                    view.error = Some(err.clone());
                }
            }
        }
    }
    view
}

/// All resources of a release, grouped the way they are displayed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceView {
    pub deployments: KindView,
    pub services: KindView,
    pub ingresses: KindView,
    pub secrets: KindView,
    /// Static resources keyed by `kind/name`
    pub other_resources: BTreeMap<String, ResourceDescriptor>,
}

impl ResourceView {
    pub fn project(state: &AggregateState) -> Self {
        Self {
            deployments: project_kind(state, &ResourceKind::Deployment),
            services: project_kind(state, &ResourceKind::Service),
            ingresses: project_kind(state, &ResourceKind::Ingress),
            secrets: project_kind(state, &ResourceKind::Secret),
            other_resources: state.statics().clone(),
        }
    }

    /// View of a watchable kind (`None` for `Other`)
    pub fn kind(&self, kind: &ResourceKind) -> Option<&KindView> {
        match kind {
            ResourceKind::Deployment => Some(&self.deployments),
            ResourceKind::Service => Some(&self.services),
            ResourceKind::Ingress => Some(&self.ingresses),
            ResourceKind::Secret => Some(&self.secrets),
            ResourceKind::Other(_) => None,
        }
    }

    /// True while any watchable kind is still loading
    pub fn is_loading(&self) -> bool {
        self.deployments.loading
            || self.services.loading
            || self.ingresses.loading
            || self.secrets.loading
    }
}

/// Chart information shown next to the release
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    /// `name-version`
    pub label: String,
    pub app_version: Option<String>,
}

/// The release being displayed with everything derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseView {
    pub release: ReleaseRef,
    pub revision: i64,
    pub status: ReleaseStatus,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub chart: Option<ChartView>,
    pub resources: ResourceView,
    pub access_urls: Vec<String>,
    /// Services or ingresses are still loading
    pub access_urls_loading: bool,
}

/// What presentation renders
#[derive(Debug, Clone, PartialEq)]
pub enum AppView {
    /// No release has been received yet
    Loading,
    /// The release could not be loaded; pre-empts every resource
    Failed { message: String },
    Ready(Box<ReleaseView>),
}

impl AppView {
    /// Build the full view for a release and its aggregate state
    pub fn project(release: &Release, state: &AggregateState) -> Self {
        // A release without info has not finished loading
        let Some(info) = release.info.as_ref() else {
            return AppView::Loading;
        };

        let resources = ResourceView::project(state);
        let status = release_status(Some(info), &resources.deployments.items);
        let access_urls = access_urls(&resources.services.items, &resources.ingresses.items);
        let access_urls_loading = resources.services.loading || resources.ingresses.loading;

        let chart = release.chart_label().map(|label| ChartView {
            label,
            app_version: release
                .chart
                .as_ref()
                .and_then(|c| c.metadata.as_ref())
                .and_then(|m| m.app_version.clone()),
        });

        AppView::Ready(Box::new(ReleaseView {
            release: release.release_ref(),
            revision: release.version,
            status,
            description: info.description.clone(),
            notes: info.notes.clone().filter(|n| !n.trim().is_empty()),
            chart,
            resources,
            access_urls,
            access_urls_loading,
        }))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        AppView::Failed {
            message: message.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        match self {
            AppView::Loading => true,
            AppView::Failed { .. } => false,
            AppView::Ready(view) => view.resources.is_loading(),
        }
    }

    pub fn as_ready(&self) -> Option<&ReleaseView> {
        match self {
            AppView::Ready(view) => Some(view),
            _ => None,
        }
    }
}
