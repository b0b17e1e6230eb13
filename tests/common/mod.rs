//! Fakes shared by the integration tests
//!
//! `RecordingTransport` hands out connections that only record when they are
//! closed and keeps every sink so tests can play the part of the API server.

#![allow(dead_code)]

use async_trait::async_trait;
use relwatch::error::{ReleaseFetchError, TransportError};
use relwatch::kube::ReleaseFetcher;
use relwatch::manifest::WatchTarget;
use relwatch::models::{Release, ReleaseInfo};
use relwatch::watcher::{Connection, EventSink, TransportEvent, WatchTransport};
use serde_json::{Value, json};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct Recorded {
    /// Every open, in order: key, target and the sink it was given
    pub opened: Vec<(String, WatchTarget, EventSink)>,
    /// Keys whose connection was closed, in order
    pub closed: Vec<String>,
    /// Keys the transport refuses to open
    pub refuse: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub log: Arc<Mutex<Recorded>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&self, key: &str) {
        self.log.lock().unwrap().refuse.insert(key.to_string());
    }

    pub fn opened_keys(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .opened
            .iter()
            .map(|(k, _, _)| k.clone())
            .collect()
    }

    pub fn closed_keys(&self) -> Vec<String> {
        self.log.lock().unwrap().closed.clone()
    }

    pub fn open_count(&self) -> usize {
        self.log.lock().unwrap().opened.len()
    }

    /// Sink of the most recent connection opened for `key`
    pub fn sink(&self, key: &str) -> EventSink {
        self.log
            .lock()
            .unwrap()
            .opened
            .iter()
            .rev()
            .find(|(k, _, _)| k == key)
            .map(|(_, _, sink)| sink.clone())
            .unwrap_or_else(|| panic!("no connection opened for {}", key))
    }

    pub fn target(&self, key: &str) -> WatchTarget {
        self.log
            .lock()
            .unwrap()
            .opened
            .iter()
            .rev()
            .find(|(k, _, _)| k == key)
            .map(|(_, target, _)| target.clone())
            .unwrap_or_else(|| panic!("no connection opened for {}", key))
    }

    /// Deliver the current object for `kind/name` on its latest connection
    pub fn apply(&self, kind: &str, name: &str, payload: Value) {
        let key = format!("{}/{}", kind, name);
        assert!(self.sink(&key).send(TransportEvent::Applied(payload)));
    }

    pub fn fail(&self, key: &str, error: TransportError) {
        assert!(self.sink(key).send(TransportEvent::Error(error)));
    }

    /// Report that the latest connection for `key` gave up for good
    pub fn stop(&self, key: &str) {
        assert!(self.sink(key).send(TransportEvent::Closed));
    }
}

struct RecordingConnection {
    key: String,
    log: Arc<Mutex<Recorded>>,
}

impl Connection for RecordingConnection {
    fn close(&mut self) {
        self.log.lock().unwrap().closed.push(self.key.clone());
    }
}

impl WatchTransport for RecordingTransport {
    fn open_watch(
        &self,
        target: &WatchTarget,
        sink: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let key = target.key();
        let mut log = self.log.lock().unwrap();
        if log.refuse.contains(&key) {
            return Err(TransportError::Open(format!("{} refused", key)));
        }
        log.opened.push((key.clone(), target.clone(), sink));
        Ok(Box::new(RecordingConnection {
            key,
            log: self.log.clone(),
        }))
    }
}

/// Release fetcher that answers from a queue, repeating the last answer
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    answers: Arc<Mutex<VecDeque<Result<Release, ReleaseFetchError>>>>,
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, answer: Result<Release, ReleaseFetchError>) {
        self.answers.lock().unwrap().push_back(answer);
    }
}

#[async_trait]
impl ReleaseFetcher for ScriptedFetcher {
    async fn get_release(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Release, ReleaseFetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), namespace.to_string()));
        let mut answers = self.answers.lock().unwrap();
        match answers.len() {
            0 => Err(ReleaseFetchError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
            1 => answers[0].clone(),
            _ => answers.pop_front().unwrap(),
        }
    }
}

/// A deployed release with the given manifest
pub fn release(name: &str, namespace: &str, manifest: &str) -> Release {
    Release {
        name: name.to_string(),
        namespace: namespace.to_string(),
        version: 1,
        manifest: manifest.to_string(),
        info: Some(ReleaseInfo {
            status: Some("deployed".to_string()),
            description: Some("Install complete".to_string()),
            notes: None,
            last_deployed: None,
        }),
        chart: None,
    }
}

/// Manifest text declaring `kind/name` pairs in order
pub fn manifest(resources: &[(&str, &str)]) -> String {
    resources
        .iter()
        .map(|(kind, name)| {
            let api_version = match *kind {
                "Deployment" => "apps/v1",
                "Ingress" => "networking.k8s.io/v1",
                _ => "v1",
            };
            format!(
                "apiVersion: {}\nkind: {}\nmetadata:\n  name: {}\n",
                api_version, kind, name
            )
        })
        .collect::<Vec<_>>()
        .join("---\n")
}

/// Minimal object as a watch would deliver it
pub fn object(kind: &str, name: &str) -> Value {
    json!({
        "kind": kind,
        "metadata": {"name": name},
    })
}
