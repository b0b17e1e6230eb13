//! Watcher module
//!
//! Owns one live connection per watchable resource of the current manifest
//! snapshot and turns what those connections deliver into state events.
//!
//! Connections run independently and report through a shared channel. Every
//! connection is opened under a fresh `HandleId`; once a handle is closed its
//! id is forgotten, so anything still in flight from it is dropped instead of
//! resurrecting an entry that belongs to an older snapshot.

mod state;
mod transport;

pub use state::*;
pub use transport::*;

use crate::error::{MalformedEvent, TransportError};
use crate::manifest::WatchTarget;
use crate::models::{ResourceKind, resource_key};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connection state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Opened, nothing received yet
    Connecting,
    /// At least one message received
    Open,
    Closed,
}

/// One live connection, private to the manager
struct WatchHandle {
    id: HandleId,
    target: WatchTarget,
    state: TransportState,
    connection: Box<dyn Connection>,
}

impl WatchHandle {
    fn close(&mut self) {
        if self.state != TransportState::Closed {
            self.connection.close();
            self.state = TransportState::Closed;
        }
    }
}

/// What a call to `reconcile` changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Keys that got a new connection
    pub opened: Vec<String>,
    /// Keys whose connection was closed
    pub closed: Vec<String>,
    /// Keys whose connection was left untouched
    pub retained: Vec<String>,
    /// Targets the transport refused to open
    pub failed: Vec<(WatchTarget, TransportError)>,
}

impl ReconcileOutcome {
    /// True when no connection was opened or closed
    pub fn is_noop(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty() && self.failed.is_empty()
    }

    pub fn retained_keys(&self) -> HashSet<String> {
        self.retained.iter().cloned().collect()
    }
}

/// Manages the set of live watches
///
/// Closing is synchronous: once `close`/`close_all` returns, nothing more
/// from the closed handles reaches the state.
pub struct WatchConnectionManager {
    transport: Arc<dyn WatchTransport>,
    handles: HashMap<String, WatchHandle>,
    live: HashMap<HandleId, String>,
    next_id: u64,
    event_tx: mpsc::UnboundedSender<WatchMessage>,
}

impl WatchConnectionManager {
    /// Create a manager and the receiver its connections report to
    pub fn new(
        transport: Arc<dyn WatchTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<WatchMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                transport,
                handles: HashMap::new(),
                live: HashMap::new(),
                next_id: 0,
                event_tx: tx,
            },
            rx,
        )
    }

    /// Bring the open connections in line with `targets`
    ///
    /// Closes connections whose key is gone or whose target changed (for
    /// example a different namespace), opens one for every uncovered target,
    /// and leaves the rest alone. A connection that reported `Closed` counts
    /// as uncovered and is opened again.
    pub fn reconcile(&mut self, targets: &[WatchTarget]) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        // Connections that stopped on their own no longer cover their key
        let dead: Vec<String> = self
            .handles
            .iter()
            .filter(|(_, handle)| handle.state == TransportState::Closed)
            .map(|(key, _)| key.clone())
            .collect();
        for key in dead {
            tracing::debug!("Dropping stopped watch for {}", key);
            self.handles.remove(&key);
        }

        let desired: HashMap<String, &WatchTarget> =
            targets.iter().map(|t| (t.key(), t)).collect();

        let mut stale: Vec<String> = self
            .handles
            .iter()
            .filter(|(key, handle)| desired.get(*key).is_none_or(|t| **t != handle.target))
            .map(|(key, _)| key.clone())
            .collect();
        stale.sort();

        for key in stale {
            self.close(&key);
            outcome.closed.push(key);
        }

        for target in targets {
            let key = target.key();
            if self.handles.contains_key(&key) {
                if !outcome.retained.contains(&key) && !outcome.opened.contains(&key) {
                    outcome.retained.push(key);
                }
                continue;
            }
            match self.open(target) {
                Ok(_) => outcome.opened.push(key),
                Err(e) => {
                    tracing::warn!("Failed to open watch for {}: {}", key, e);
                    outcome.failed.push((target.clone(), e));
                }
            }
        }

        tracing::debug!(
            "Reconciled watches: {} opened, {} closed, {} retained, {} failed",
            outcome.opened.len(),
            outcome.closed.len(),
            outcome.retained.len(),
            outcome.failed.len()
        );

        outcome
    }

    fn open(&mut self, target: &WatchTarget) -> Result<HandleId, TransportError> {
        self.next_id += 1;
        let id = HandleId(self.next_id);
        let sink = EventSink::new(id, self.event_tx.clone());
        let connection = self.transport.open_watch(target, sink)?;

        let key = target.key();
        tracing::debug!("Opened watch {} for {}", id, key);
        self.live.insert(id, key.clone());
        self.handles.insert(
            key,
            WatchHandle {
                id,
                target: target.clone(),
                state: TransportState::Connecting,
                connection,
            },
        );
        Ok(id)
    }

    /// Route one message from a connection
    ///
    /// Returns the state event to apply, or `None` when the message came
    /// from a closed handle, could not be routed or changes no state.
    pub fn on_message(&mut self, message: WatchMessage) -> Option<StateEvent> {
        match message.event {
            TransportEvent::Applied(payload) => self.on_event(message.handle, payload),
            TransportEvent::Deleted(payload) => self.on_deleted(message.handle, payload),
            TransportEvent::Error(err) => self.on_transport_error(message.handle, err),
            TransportEvent::Closed => {
                self.on_closed(message.handle);
                None
            }
        }
    }

    /// A connection stopped by itself
    ///
    /// The entry keeps whatever state it last reached; the key is reopened by
    /// the next `reconcile`.
    pub fn on_closed(&mut self, id: HandleId) {
        let Some(key) = self.live.remove(&id) else {
            return;
        };
        if let Some(handle) = self.handles.get_mut(&key) {
            tracing::debug!("Watch {} for {} stopped", id, key);
            handle.state = TransportState::Closed;
        }
    }

    /// True when some connection stopped and is waiting to be reopened
    pub fn has_stopped(&self) -> bool {
        self.handles
            .values()
            .any(|handle| handle.state == TransportState::Closed)
    }

    /// A connection delivered the current object
    pub fn on_event(&mut self, handle: HandleId, payload: Value) -> Option<StateEvent> {
        let target = self.accept(handle)?;
        match route_payload(&target, &payload) {
            Ok((kind, name)) => Some(StateEvent::Loaded {
                kind,
                name,
                payload,
            }),
            Err(e) => {
                tracing::warn!(
                    "Dropping malformed event from watch {} ({}): {}",
                    handle,
                    target.key(),
                    e
                );
                None
            }
        }
    }

    fn on_deleted(&mut self, handle: HandleId, payload: Value) -> Option<StateEvent> {
        let target = self.accept(handle)?;
        match route_payload(&target, &payload) {
            Ok((kind, name)) => Some(StateEvent::Deleted { kind, name }),
            Err(e) => {
                tracing::warn!("Dropping malformed delete from watch {}: {}", handle, e);
                None
            }
        }
    }

    /// A connection failed; only its own resource is affected
    pub fn on_transport_error(
        &mut self,
        handle: HandleId,
        error: TransportError,
    ) -> Option<StateEvent> {
        let target = self.accept(handle)?;
        tracing::warn!("Watch {} for {} failed: {}", handle, target.key(), error);
        Some(StateEvent::TransportFailed {
            kind: target.kind,
            name: target.name,
            error,
        })
    }

    /// Resolve a live handle and mark it open
    fn accept(&mut self, id: HandleId) -> Option<WatchTarget> {
        let Some(key) = self.live.get(&id) else {
            tracing::debug!("Ignoring message from closed watch {}", id);
            return None;
        };
        let handle = self.handles.get_mut(key)?;
        if handle.state == TransportState::Connecting {
            handle.state = TransportState::Open;
        }
        Some(handle.target.clone())
    }

    /// Close the connection for `key`; returns false if none was open
    pub fn close(&mut self, key: &str) -> bool {
        match self.handles.remove(key) {
            Some(mut handle) => {
                handle.close();
                self.live.remove(&handle.id);
                tracing::debug!("Closed watch {} for {}", handle.id, key);
                true
            }
            None => false,
        }
    }

    /// Close every connection; returns how many were open
    pub fn close_all(&mut self) -> usize {
        let count = self.live.len();
        for (_, mut handle) in self.handles.drain() {
            handle.close();
        }
        self.live.clear();
        if count > 0 {
            tracing::debug!("Closed {} watches", count);
        }
        count
    }

    pub fn is_watching(&self, key: &str) -> bool {
        self.handles
            .get(key)
            .is_some_and(|handle| handle.state != TransportState::Closed)
    }

    pub fn handle_id(&self, key: &str) -> Option<HandleId> {
        self.handles.get(key).map(|h| h.id)
    }

    pub fn handle_state(&self, key: &str) -> Option<TransportState> {
        self.handles.get(key).map(|h| h.state)
    }

    pub fn open_count(&self) -> usize {
        self.live.len()
    }

    /// Keys of all open connections, sorted
    pub fn watched_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.live.values().cloned().collect();
        keys.sort();
        keys
    }
}

impl Drop for WatchConnectionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Check a watch payload belongs to `target` and extract its kind and name
pub fn route_payload(
    target: &WatchTarget,
    payload: &Value,
) -> Result<(ResourceKind, String), MalformedEvent> {
    if !payload.is_object() {
        return Err(MalformedEvent::NotAnObject);
    }

    let kind = payload
        .get("kind")
        .and_then(|k| k.as_str())
        .filter(|k| !k.is_empty())
        .ok_or(MalformedEvent::MissingKind)?;

    let name = payload
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())
        .ok_or(MalformedEvent::MissingName)?;

    let kind = ResourceKind::from_kind(kind);
    let found = resource_key(&kind, name);
    if found != target.key() {
        return Err(MalformedEvent::TargetMismatch {
            expected: target.key(),
            found,
        });
    }

    Ok((kind, name.to_string()))
}
