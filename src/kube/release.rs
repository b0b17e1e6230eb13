//! Helm release fetching
//!
//! Helm 3 keeps every release revision in a Secret labelled
//! `owner=helm,name=<release>,version=<n>`. The `release` key holds the
//! release record: base64 text of (usually gzipped) JSON.

use crate::error::ReleaseFetchError;
use crate::models::Release;
use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use kube::api::ListParams;
use std::io::Read;

/// Loads the release that owns a manifest
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    async fn get_release(&self, name: &str, namespace: &str)
    -> Result<Release, ReleaseFetchError>;
}

/// Reads releases from Helm's Secret storage driver
pub struct HelmReleaseFetcher {
    client: kube::Client,
}

impl HelmReleaseFetcher {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReleaseFetcher for HelmReleaseFetcher {
    async fn get_release(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Release, ReleaseFetchError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&format!("owner=helm,name={}", name));

        let list = secrets
            .list(&params)
            .await
            .map_err(|e| ReleaseFetchError::Api(e.to_string()))?;

        let latest = list
            .items
            .into_iter()
            .max_by_key(secret_revision)
            .ok_or_else(|| ReleaseFetchError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })?;

        tracing::debug!(
            "Using Helm storage Secret {} (revision {})",
            latest.metadata.name.as_deref().unwrap_or_default(),
            secret_revision(&latest)
        );

        let data = latest
            .data
            .as_ref()
            .and_then(|data| data.get("release"))
            .ok_or_else(|| ReleaseFetchError::Decode("Secret missing 'release' key".to_string()))?;

        decode_release(&data.0)
    }
}

/// Revision number from a storage Secret's `version` label
fn secret_revision(secret: &Secret) -> i64 {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get("version"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Decode a Helm release record: base64 → gzip detection → decompress → JSON
pub fn decode_release(data: &[u8]) -> Result<Release, ReleaseFetchError> {
    decode_release_inner(data).map_err(|e| ReleaseFetchError::Decode(format!("{:#}", e)))
}

fn decode_release_inner(data: &[u8]) -> anyhow::Result<Release> {
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Failed to decode base64 release data")?;

    // Check for gzip magic bytes (0x1f, 0x8b, 0x08)
    let is_gzipped =
        decoded.len() >= 3 && decoded[0] == 0x1f && decoded[1] == 0x8b && decoded[2] == 0x08;

    let decompressed = if is_gzipped {
        let mut decoder = flate2::read::GzDecoder::new(&decoded[..]);
        let mut buf = Vec::new();
        decoder
            .read_to_end(&mut buf)
            .context("Failed to decompress gzip release data")?;
        buf
    } else {
        decoded
    };

    let release: Release =
        serde_json::from_slice(&decompressed).context("Failed to parse release JSON")?;

    tracing::debug!(
        "Decoded release {}/{} v{} ({} manifest bytes)",
        release.namespace,
        release.name,
        release.version,
        release.manifest.len()
    );

    Ok(release)
}
