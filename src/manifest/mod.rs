//! Manifest parsing
//!
//! Turns a release's rendered multi-document YAML into an ordered
//! `ManifestSnapshot`. Blank separators, documents without a `kind` and
//! documents that are not mappings are routine in Helm output and are
//! skipped, as is a document that tokenizes but does not decode (duplicate
//! mapping keys, for one). Only text that cannot be tokenized fails the parse.

mod selector;

pub use selector::*;

use crate::error::ParseError;
use crate::models::{ManifestSnapshot, ReleaseRef, ResourceDescriptor, ResourceKind};
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;

/// Parse manifest text into a snapshot for `release`
///
/// Descriptors keep document order. A resource without `metadata.namespace`
/// lives in the release namespace.
pub fn parse_manifest(text: &str, release: &ReleaseRef) -> Result<ManifestSnapshot, ParseError> {
    // Tokenize everything first; only this pass can fail the whole manifest
    for document in serde_yaml::Deserializer::from_str(text) {
        IgnoredAny::deserialize(document)?;
    }

    let mut descriptors = Vec::new();
    for (idx, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = match serde_yaml::Value::deserialize(document) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Skipping malformed manifest document {}: {}", idx, e);
                continue;
            }
        };
        match descriptor_from_document(value, &release.namespace) {
            Some(descriptor) => descriptors.push(descriptor),
            None => tracing::debug!("Skipping manifest document {}", idx),
        }
    }

    tracing::debug!(
        "Parsed {} resources from manifest of release {}",
        descriptors.len(),
        release
    );

    Ok(ManifestSnapshot::new(release.clone(), descriptors))
}

/// Build a descriptor from one YAML document, or `None` if it should be skipped
fn descriptor_from_document(
    value: serde_yaml::Value,
    release_namespace: &str,
) -> Option<ResourceDescriptor> {
    if value.is_null() {
        return None;
    }

    // Non-string keys and similar YAML-only constructs cannot become JSON
    let raw: Value = match serde_json::to_value(&value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("Manifest document is not JSON compatible: {}", e);
            return None;
        }
    };

    let kind = raw.get("kind").and_then(|k| k.as_str()).unwrap_or("");
    if kind.is_empty() {
        return None;
    }

    // List documents are not expanded into their items
    if kind == "List" {
        tracing::debug!("Skipping List document");
        return None;
    }

    let metadata = raw.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())?
        .to_string();

    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(release_namespace)
        .to_string();

    let api_version = raw
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .unwrap_or("v1")
        .to_string();

    Some(ResourceDescriptor {
        kind: ResourceKind::from_kind(kind),
        api_version,
        name,
        namespace,
        raw,
    })
}
