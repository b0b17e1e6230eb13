//! relwatch library
//!
//! Manifest-to-watch reconciliation for Helm releases: parse a release
//! manifest, keep one live watch per watchable resource, fold what the
//! watches report into a per-kind state, and project that state into a view
//! model. The `relwatch` binary is a thin CLI over this crate.

pub mod cli;
pub mod config;
pub mod error;
pub mod kube;
pub mod manifest;
pub mod models;
pub mod services;
pub mod view;
pub mod watcher;

// Re-export commonly used types for convenience
pub use error::{MalformedEvent, ParseError, RefreshError, ReleaseFetchError, TransportError};
pub use manifest::{WatchTarget, parse_manifest, select_targets};
pub use models::{ManifestSnapshot, Release, ReleaseRef, ResourceDescriptor, ResourceKind};
pub use services::AppSession;
pub use view::AppView;
pub use watcher::{AggregateState, StateEvent, WatchConnectionManager, reduce};
