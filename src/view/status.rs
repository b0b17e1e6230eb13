//! Release status summary
//!
//! Combines Helm's own status for the release with the readiness of the
//! deployments it manages.

use crate::models::ReleaseInfo;
use k8s_openapi::api::apps::v1::Deployment;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// Deployed and every deployment has its replicas available
    Ready,
    /// Deployed (or pending) but some deployment is not available yet
    NotReady,
    Failed,
    Deleted,
    /// Status Helm reported that we do not interpret
    Unknown(String),
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseStatus::Ready => write!(f, "Ready"),
            ReleaseStatus::NotReady => write!(f, "Not Ready"),
            ReleaseStatus::Failed => write!(f, "Failed"),
            ReleaseStatus::Deleted => write!(f, "Deleted"),
            ReleaseStatus::Unknown(s) if s.is_empty() => write!(f, "Unknown"),
            ReleaseStatus::Unknown(s) => write!(f, "Unknown ({})", s),
        }
    }
}

/// Summarize a release from its info and its loaded deployments
///
/// Helm 2 reported statuses in upper case (`DEPLOYED`), Helm 3 in kebab
/// case (`deployed`); both are accepted.
pub fn release_status(info: Option<&ReleaseInfo>, deployments: &[Value]) -> ReleaseStatus {
    let status = info
        .and_then(|i| i.status.as_deref())
        .unwrap_or_default()
        .to_ascii_lowercase()
        .replace('_', "-");

    match status.as_str() {
        "deployed" => {
            if deployments.iter().all(deployment_ready) {
                ReleaseStatus::Ready
            } else {
                ReleaseStatus::NotReady
            }
        }
        "pending-install" | "pending-upgrade" | "pending-rollback" => ReleaseStatus::NotReady,
        "failed" => ReleaseStatus::Failed,
        "deleted" | "deleting" | "uninstalled" | "uninstalling" => ReleaseStatus::Deleted,
        other => ReleaseStatus::Unknown(other.to_string()),
    }
}

/// A deployment is ready once its available replicas reach the desired count
pub fn deployment_ready(payload: &Value) -> bool {
    let Ok(deployment) = serde_json::from_value::<Deployment>(payload.clone()) else {
        tracing::debug!("Deployment payload did not decode, treating as not ready");
        return false;
    };

    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);

    available >= desired
}

/// `available/desired` replica summary for display
pub fn replica_summary(payload: &Value) -> String {
    let desired = payload
        .pointer("/spec/replicas")
        .and_then(Value::as_i64)
        .unwrap_or(1);
    let available = payload
        .pointer("/status/availableReplicas")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    format!("{}/{}", available, desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(status: &str) -> ReleaseInfo {
        ReleaseInfo {
            status: Some(status.to_string()),
            description: None,
            notes: None,
            last_deployed: None,
        }
    }

    fn deployment(replicas: Option<i64>, available: Option<i64>) -> Value {
        let mut d = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {"selector": {}, "template": {}},
            "status": {}
        });
        if let Some(r) = replicas {
            d["spec"]["replicas"] = json!(r);
        }
        if let Some(a) = available {
            d["status"]["availableReplicas"] = json!(a);
        }
        d
    }

    #[test]
    fn test_deployment_ready_defaults_to_one_replica() {
        assert!(deployment_ready(&deployment(None, Some(1))));
        assert!(!deployment_ready(&deployment(None, None)));
        assert!(deployment_ready(&deployment(Some(3), Some(3))));
        assert!(!deployment_ready(&deployment(Some(3), Some(2))));
        assert!(deployment_ready(&deployment(Some(0), None)));
    }

    #[test]
    fn test_deployed_release_depends_on_deployments() {
        let ready = vec![deployment(Some(2), Some(2))];
        let not_ready = vec![deployment(Some(2), Some(2)), deployment(Some(1), Some(0))];

        assert_eq!(
            release_status(Some(&info("deployed")), &ready),
            ReleaseStatus::Ready
        );
        assert_eq!(
            release_status(Some(&info("DEPLOYED")), &not_ready),
            ReleaseStatus::NotReady
        );
        assert_eq!(
            release_status(Some(&info("deployed")), &[]),
            ReleaseStatus::Ready
        );
    }

    #[test]
    fn test_other_statuses() {
        assert_eq!(
            release_status(Some(&info("failed")), &[]),
            ReleaseStatus::Failed
        );
        assert_eq!(
            release_status(Some(&info("uninstalled")), &[]),
            ReleaseStatus::Deleted
        );
        assert_eq!(
            release_status(Some(&info("PENDING_UPGRADE")), &[]),
            ReleaseStatus::NotReady
        );
        assert_eq!(
            release_status(Some(&info("superseded")), &[]),
            ReleaseStatus::Unknown("superseded".to_string())
        );
        assert_eq!(release_status(None, &[]).to_string(), "Unknown");
    }

    #[test]
    fn test_replica_summary() {
        assert_eq!(replica_summary(&deployment(Some(3), Some(1))), "1/3");
        assert_eq!(replica_summary(&deployment(None, None)), "0/1");
    }
}
