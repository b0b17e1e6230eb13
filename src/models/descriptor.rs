//! Typed references to manifest resources

use super::release::ReleaseRef;
use super::resource_kind::{ResourceKind, resource_key};
use serde_json::Value;

/// One resource declared by a release manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub api_version: String,
    pub name: String,
    pub namespace: String,
    /// The document as parsed, untouched
    pub raw: Value,
}

impl ResourceDescriptor {
    /// Identity key `kind/name`
    pub fn key(&self) -> String {
        resource_key(&self.kind, &self.name)
    }
}

/// Ordered descriptors parsed from one release manifest
///
/// Equality only looks at the descriptor sequence: the same manifest read
/// from two fetches of a release compares equal.
#[derive(Debug, Clone)]
pub struct ManifestSnapshot {
    pub release: ReleaseRef,
    pub descriptors: Vec<ResourceDescriptor>,
}

impl ManifestSnapshot {
    pub fn new(release: ReleaseRef, descriptors: Vec<ResourceDescriptor>) -> Self {
        Self {
            release,
            descriptors,
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Find a descriptor by its `kind/name` key
    pub fn get(&self, key: &str) -> Option<&ResourceDescriptor> {
        self.descriptors.iter().find(|d| d.key() == key)
    }
}

impl PartialEq for ManifestSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.descriptors == other.descriptors
    }
}
