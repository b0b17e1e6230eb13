//! One-shot resource fetching
//!
//! Used for resources whose watch cannot be served; reads the object once
//! through a dynamic API.

use super::split_api_version;
use crate::error::TransportError;
use crate::models::ResourceKind;
use async_trait::async_trait;
use kube::Api;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, TypeMeta};
use serde_json::Value;

/// Fetches a single resource
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn get_resource(
        &self,
        api_version: &str,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, TransportError>;
}

/// Build the dynamic API description for a kind
pub fn api_resource_for(api_version: &str, kind: &ResourceKind) -> ApiResource {
    let (group, version) = split_api_version(api_version);
    let gvk = GroupVersionKind::gvk(group, version, kind.as_str());
    ApiResource::from_gvk_with_plural(&gvk, &kind.plural())
}

/// Serialize an object for the state, filling in type information that
/// list responses leave out of their items
pub fn object_payload(mut obj: DynamicObject, api_version: &str, kind: &ResourceKind) -> Value {
    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: api_version.to_string(),
            kind: kind.as_str().to_string(),
        });
    }
    serde_json::to_value(&obj).unwrap_or_default()
}

pub struct KubeResourceFetcher {
    client: kube::Client,
}

impl KubeResourceFetcher {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceFetcher for KubeResourceFetcher {
    async fn get_resource(
        &self,
        api_version: &str,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, TransportError> {
        let ar = api_resource_for(api_version, kind);
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);

        tracing::debug!("Fetching {}/{} in namespace {}", kind, name, namespace);

        match api.get(name).await {
            Ok(obj) => Ok(object_payload(obj, api_version, kind)),
            Err(e) => Err(TransportError::Fetch(format!(
                "{}/{} in {}: {}",
                kind, name, namespace, e
            ))),
        }
    }
}
