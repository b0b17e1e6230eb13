//! Data models
//!
//! Typed resource kinds, manifest descriptors and Helm release records.

pub mod descriptor;
pub mod release;
pub mod resource_kind;

pub use descriptor::{ManifestSnapshot, ResourceDescriptor};
pub use release::{Chart, ChartMetadata, Release, ReleaseInfo, ReleaseRef};
pub use resource_kind::{ResourceKind, resource_key};
