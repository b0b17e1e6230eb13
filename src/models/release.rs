//! Helm release records
//!
//! Mirrors the JSON Helm stores in its release Secrets. Only the fields the
//! view needs are decoded; everything else is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the release being viewed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseRef {
    pub name: String,
    pub namespace: String,
}

impl ReleaseRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A deployed release as returned by the release fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub version: i64,
    /// Rendered multi-document YAML
    #[serde(default)]
    pub manifest: String,
    #[serde(default)]
    pub info: Option<ReleaseInfo>,
    #[serde(default)]
    pub chart: Option<Chart>,
}

impl Release {
    pub fn release_ref(&self) -> ReleaseRef {
        ReleaseRef::new(self.name.clone(), self.namespace.clone())
    }

    /// `name-version` of the chart this release was installed from
    pub fn chart_label(&self) -> Option<String> {
        let metadata = self.chart.as_ref()?.metadata.as_ref()?;
        match &metadata.version {
            Some(version) => Some(format!("{}-{}", metadata.name, version)),
            None => Some(metadata.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub last_deployed: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub metadata: Option<ChartMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_deserialization() {
        let json = r#"{
            "name": "blog",
            "namespace": "web",
            "version": 3,
            "manifest": "---\nkind: Service\n",
            "info": {
                "status": "deployed",
                "notes": "Visit the blog",
                "last_deployed": "2024-01-01T00:00:00Z"
            },
            "chart": {"metadata": {"name": "wordpress", "version": "1.2.0", "appVersion": "6.4"}},
            "config": {"ignored": true}
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.name, "blog");
        assert_eq!(release.version, 3);
        assert_eq!(
            release.info.as_ref().and_then(|i| i.status.as_deref()),
            Some("deployed")
        );
        assert_eq!(release.chart_label(), Some("wordpress-1.2.0".to_string()));
        assert_eq!(release.release_ref(), ReleaseRef::new("blog", "web"));
    }

    #[test]
    fn test_release_minimal() {
        let release: Release =
            serde_json::from_str(r#"{"name": "x", "namespace": "y"}"#).unwrap();
        assert!(release.manifest.is_empty());
        assert!(release.info.is_none());
        assert!(release.chart_label().is_none());
    }

    #[test]
    fn test_release_ref_display() {
        assert_eq!(ReleaseRef::new("app", "prod").to_string(), "prod/app");
    }
}
