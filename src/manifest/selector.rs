//! Watch target selection
//!
//! Splits a snapshot into resources that get a live watch and resources that
//! are only listed. The split depends on nothing but the kind, and is redone
//! from scratch for every snapshot.

use crate::models::{ManifestSnapshot, ResourceDescriptor, ResourceKind, resource_key};
use std::collections::{BTreeMap, HashSet};

/// Everything needed to open one watch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchTarget {
    pub kind: ResourceKind,
    pub api_version: String,
    pub namespace: String,
    pub name: String,
}

impl WatchTarget {
    pub fn key(&self) -> String {
        resource_key(&self.kind, &self.name)
    }
}

impl From<&ResourceDescriptor> for WatchTarget {
    fn from(descriptor: &ResourceDescriptor) -> Self {
        Self {
            kind: descriptor.kind.clone(),
            api_version: descriptor.api_version.clone(),
            namespace: descriptor.namespace.clone(),
            name: descriptor.name.clone(),
        }
    }
}

/// Result of partitioning a snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPartition {
    /// One target per watchable resource, in manifest order
    pub watchable: Vec<WatchTarget>,
    /// Everything else, keyed by `kind/name`
    pub statics: BTreeMap<String, ResourceDescriptor>,
}

/// Partition a snapshot into watch targets and static resources
///
/// A repeated `kind/name` keeps its first occurrence.
pub fn select_targets(snapshot: &ManifestSnapshot) -> TargetPartition {
    let mut partition = TargetPartition::default();
    let mut seen = HashSet::new();

    for descriptor in &snapshot.descriptors {
        let key = descriptor.key();
        if !seen.insert(key.clone()) {
            tracing::warn!("Duplicate resource {} in manifest, ignoring", key);
            continue;
        }

        if descriptor.kind.is_watchable() {
            partition.watchable.push(WatchTarget::from(descriptor));
        } else {
            partition.statics.insert(key, descriptor.clone());
        }
    }

    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReleaseRef;
    use serde_json::json;

    fn descriptor(kind: &str, name: &str, namespace: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            kind: ResourceKind::from_kind(kind),
            api_version: "v1".to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            raw: json!({"kind": kind, "metadata": {"name": name}}),
        }
    }

    fn snapshot(descriptors: Vec<ResourceDescriptor>) -> ManifestSnapshot {
        ManifestSnapshot::new(ReleaseRef::new("app", "default"), descriptors)
    }

    #[test]
    fn test_select_targets_partitions_by_kind() {
        let partition = select_targets(&snapshot(vec![
            descriptor("Deployment", "api", "default"),
            descriptor("ConfigMap", "cfg", "default"),
            descriptor("Service", "api", "default"),
            descriptor("Ingress", "api", "default"),
            descriptor("Secret", "creds", "default"),
            descriptor("ServiceAccount", "api", "default"),
        ]));

        let keys: Vec<String> = partition.watchable.iter().map(|t| t.key()).collect();
        assert_eq!(
            keys,
            vec!["Deployment/api", "Service/api", "Ingress/api", "Secret/creds"]
        );
        assert_eq!(
            partition.statics.keys().cloned().collect::<Vec<_>>(),
            vec!["ConfigMap/cfg", "ServiceAccount/api"]
        );
    }

    #[test]
    fn test_select_targets_keeps_first_duplicate() {
        let partition = select_targets(&snapshot(vec![
            descriptor("Service", "api", "a"),
            descriptor("Service", "api", "b"),
        ]));
        assert_eq!(partition.watchable.len(), 1);
        assert_eq!(partition.watchable[0].namespace, "a");
    }

    #[test]
    fn test_select_targets_is_deterministic() {
        let snap = snapshot(vec![
            descriptor("Deployment", "a", "default"),
            descriptor("Role", "r", "default"),
        ]);
        assert_eq!(select_targets(&snap), select_targets(&snap));
    }

    #[test]
    fn test_watch_target_from_descriptor() {
        let target = WatchTarget::from(&descriptor("Deployment", "api", "prod"));
        assert_eq!(target.kind, ResourceKind::Deployment);
        assert_eq!(target.namespace, "prod");
        assert_eq!(target.key(), "Deployment/api");
    }
}
