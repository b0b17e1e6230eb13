//! Resource kind definitions
//!
//! Manifest documents carry their kind as a string. It is decoded once, at
//! parse time, into `ResourceKind`; everything downstream matches on the tag.

use std::fmt;
use std::str::FromStr;

/// Kind of a manifest resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Deployment,
    Service,
    Ingress,
    Secret,
    /// Any kind without a live watch (ConfigMap, ServiceAccount, ...)
    Other(String),
}

impl ResourceKind {
    /// Kinds that get one live watch per resource
    pub const WATCHABLE: [ResourceKind; 4] = [
        ResourceKind::Deployment,
        ResourceKind::Service,
        ResourceKind::Ingress,
        ResourceKind::Secret,
    ];

    /// Decode a manifest `kind` field
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "Deployment" => ResourceKind::Deployment,
            "Service" => ResourceKind::Service,
            "Ingress" => ResourceKind::Ingress,
            "Secret" => ResourceKind::Secret,
            other => ResourceKind::Other(other.to_string()),
        }
    }

    /// Get the kind name as it appears in manifests
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::Secret => "Secret",
            ResourceKind::Other(kind) => kind,
        }
    }

    /// Whether resources of this kind are watched live
    pub fn is_watchable(&self) -> bool {
        !matches!(self, ResourceKind::Other(_))
    }

    /// Lowercase plural used in API paths (`deployments`, `ingresses`, ...)
    pub fn plural(&self) -> String {
        match self {
            ResourceKind::Deployment => "deployments".to_string(),
            ResourceKind::Service => "services".to_string(),
            ResourceKind::Ingress => "ingresses".to_string(),
            ResourceKind::Secret => "secrets".to_string(),
            ResourceKind::Other(kind) => pluralize(&kind.to_lowercase()),
        }
    }
}

/// Naive English pluralization matching how the API server names most kinds
fn pluralize(lower: &str) -> String {
    if lower.ends_with("ss") || lower.ends_with('x') || lower.ends_with("ch") {
        format!("{}es", lower)
    } else if lower.ends_with('s') {
        lower.to_string()
    } else if let Some(stem) = lower.strip_suffix('y') {
        if stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            format!("{}s", lower)
        } else {
            format!("{}ies", stem)
        }
    } else {
        format!("{}s", lower)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ResourceKind {
    fn from(kind: &str) -> Self {
        ResourceKind::from_kind(kind)
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("Empty resource kind".to_string());
        }
        Ok(ResourceKind::from_kind(s))
    }
}

/// Identity key for a resource: `kind/name`
pub fn resource_key(kind: &ResourceKind, name: &str) -> String {
    format!("{}/{}", kind.as_str(), name)
}
