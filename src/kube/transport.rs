//! Live watch transport backed by kube-rs
//!
//! Every connection is a spawned task running a `kube::runtime::watcher`
//! restricted to one object by field selector. The task forwards whatever
//! it sees to the connection's `EventSink` and is aborted on close.

use super::fetch::{ResourceFetcher, api_resource_for, object_payload};
use crate::error::TransportError;
use crate::manifest::WatchTarget;
use crate::watcher::{Connection, EventSink, TransportEvent, WatchTransport};
use futures::StreamExt;
use kube::Api;
use kube::core::DynamicObject;
use kube::runtime::watcher;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Retry policy for a single watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// Stop the watch after this many errors in a row
    pub max_consecutive_errors: u32,
    /// Pause between a failed attempt and the next one
    pub retry_delay: Duration,
    /// Read the object once when the watch gives up
    pub fetch_fallback: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 5,
            retry_delay: Duration::from_secs(1),
            fetch_fallback: true,
        }
    }
}

pub struct KubeWatchTransport {
    client: kube::Client,
    base: String,
    settings: WatchSettings,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl KubeWatchTransport {
    pub fn new(
        client: kube::Client,
        base: impl Into<String>,
        settings: WatchSettings,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        Self {
            client,
            base: base.into(),
            settings,
            fetcher,
        }
    }
}

impl WatchTransport for KubeWatchTransport {
    fn open_watch(
        &self,
        target: &WatchTarget,
        sink: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let endpoint = watch_endpoint(&self.base, target)
            .map_err(|e| TransportError::Open(format!("{}: {}", target.key(), e)))?;
        tracing::debug!("Watch {} -> {}", sink.handle(), endpoint);

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Open(e.to_string()))?;

        let ar = api_resource_for(&target.api_version, &target.kind);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &target.namespace, &ar);
        let task = run_watch(
            api,
            target.clone(),
            sink,
            self.settings.clone(),
            self.fetcher.clone(),
        );

        Ok(Box::new(runtime.spawn(task)))
    }
}

async fn run_watch(
    api: Api<DynamicObject>,
    target: WatchTarget,
    sink: EventSink,
    settings: WatchSettings,
    fetcher: Arc<dyn ResourceFetcher>,
) {
    let config = watcher::Config::default().fields(&format!("metadata.name={}", target.name));
    let mut stream = Box::pin(watcher(api, config));
    let key = target.key();
    let mut error_count = 0u32;

    while let Some(event) = stream.next().await {
        let delivered = match event {
            Ok(watcher::Event::InitApply(obj)) | Ok(watcher::Event::Apply(obj)) => {
                error_count = 0;
                sink.send(TransportEvent::Applied(object_payload(
                    obj,
                    &target.api_version,
                    &target.kind,
                )))
            }
            Ok(watcher::Event::Delete(obj)) => {
                error_count = 0;
                sink.send(TransportEvent::Deleted(object_payload(
                    obj,
                    &target.api_version,
                    &target.kind,
                )))
            }
            Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => {
                error_count = 0;
                true
            }
            Err(e) => {
                error_count += 1;
                // Report the first failure, log the rest
                let delivered = if error_count == 1 {
                    sink.send(TransportEvent::Error(TransportError::Watch(e.to_string())))
                } else {
                    tracing::debug!("{} watch error ({}): {}", key, error_count, e);
                    true
                };

                if error_count >= settings.max_consecutive_errors {
                    tracing::warn!(
                        "{} watch stopped after {} consecutive errors",
                        key,
                        error_count
                    );
                    let last = if settings.fetch_fallback {
                        fetch_once(fetcher.as_ref(), &target).await
                    } else {
                        TransportEvent::Error(TransportError::Exhausted(error_count))
                    };
                    sink.send(last);
                    sink.send(TransportEvent::Closed);
                    return;
                }

                tokio::time::sleep(settings.retry_delay).await;
                delivered
            }
        };

        if !delivered {
            tracing::debug!("{} watch receiver gone, stopping", key);
            return;
        }
    }

    tracing::debug!("{} watch stream ended", key);
    sink.send(TransportEvent::Closed);
}

/// Read the target once after its watch gave up
async fn fetch_once(fetcher: &dyn ResourceFetcher, target: &WatchTarget) -> TransportEvent {
    match fetcher
        .get_resource(
            &target.api_version,
            &target.kind,
            &target.namespace,
            &target.name,
        )
        .await
    {
        Ok(payload) => {
            tracing::debug!("Fetched {} once after watch failure", target.key());
            TransportEvent::Applied(payload)
        }
        Err(e) => TransportEvent::Error(e),
    }
}

/// URL of the watch for one target
///
/// `<base>/api/v1/...` for core resources, `<base>/apis/<group>/<version>/...`
/// otherwise, with the object selected by a `metadata.name` field selector.
pub fn watch_endpoint(base: &str, target: &WatchTarget) -> Result<Url, url::ParseError> {
    let api_path = if target.api_version == "v1" {
        "api/v1".to_string()
    } else {
        format!("apis/{}", target.api_version)
    };

    let mut url = Url::parse(&format!(
        "{}/{}/namespaces/{}/{}",
        base.trim_end_matches('/'),
        api_path,
        target.namespace,
        target.kind.plural()
    ))?;
    url.query_pairs_mut()
        .append_pair("watch", "true")
        .append_pair("fieldSelector", &format!("metadata.name={}", target.name));
    Ok(url)
}
