//! Resource state aggregation
//!
//! `AggregateState` holds one entry per watched resource, partitioned by
//! kind, plus the static resources of the current snapshot. It only changes
//! through `reduce`, which takes the old state and one event and returns the
//! new state.

use crate::error::TransportError;
use crate::manifest::WatchTarget;
use crate::models::{ResourceDescriptor, ResourceKind, resource_key};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Lifecycle of one watched resource
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    /// Watch opened, nothing received yet
    Pending,
    /// Latest object received from the watch
    Loaded(Value),
    /// The watch for this resource failed
    Errored(TransportError),
}

impl EntryState {
    pub fn is_pending(&self) -> bool {
        matches!(self, EntryState::Pending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    pub key: String,
    pub state: EntryState,
}

/// Entries of one kind, in discovery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindPartition {
    order: Vec<String>,
    entries: HashMap<String, ResourceEntry>,
}

impl KindPartition {
    fn insert(&mut self, entry: ResourceEntry) {
        if !self.entries.contains_key(&entry.key) {
            self.order.push(entry.key.clone());
        }
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Per-kind view of every resource in the current snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateState {
    partitions: BTreeMap<ResourceKind, KindPartition>,
    statics: BTreeMap<String, ResourceDescriptor>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of one kind in discovery order (empty for unknown kinds)
    pub fn entries<'a>(
        &'a self,
        kind: &ResourceKind,
    ) -> impl Iterator<Item = &'a ResourceEntry> + use<'a> {
        self.partitions.get(kind).into_iter().flat_map(|p| p.iter())
    }

    /// Look up an entry by `kind/name` key
    pub fn get(&self, key: &str) -> Option<&ResourceEntry> {
        self.partitions
            .values()
            .find_map(|partition| partition.entries.get(key))
    }

    /// Resources that are listed but never watched
    pub fn statics(&self) -> &BTreeMap<String, ResourceDescriptor> {
        &self.statics
    }

    /// Number of watched entries across all kinds
    pub fn len(&self) -> usize {
        self.partitions.values().map(KindPartition::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.statics.is_empty()
    }

    fn entry_mut(&mut self, kind: &ResourceKind, key: &str) -> Option<&mut ResourceEntry> {
        self.partitions.get_mut(kind)?.entries.get_mut(key)
    }
}

/// Inputs to the reducer
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// A new snapshot was accepted. The map is rebuilt: every watchable
    /// target starts Pending, except keys in `retain` whose connection
    /// survived reconcile and keep their previous state.
    SnapshotAccepted {
        watchable: Vec<WatchTarget>,
        statics: BTreeMap<String, ResourceDescriptor>,
        retain: HashSet<String>,
    },
    /// The watch delivered the current object
    Loaded {
        kind: ResourceKind,
        name: String,
        payload: Value,
    },
    /// The watch reported the object as deleted
    Deleted { kind: ResourceKind, name: String },
    /// The connection for this resource failed
    TransportFailed {
        kind: ResourceKind,
        name: String,
        error: TransportError,
    },
    /// Drop everything (teardown)
    Reset,
}

/// Apply one event to the state
///
/// Events for kinds that are not watched, or for keys the current snapshot
/// does not contain, leave the state unchanged.
pub fn reduce(mut state: AggregateState, event: StateEvent) -> AggregateState {
    match event {
        StateEvent::SnapshotAccepted {
            watchable,
            statics,
            retain,
        } => {
            let mut next = AggregateState {
                partitions: BTreeMap::new(),
                statics,
            };
            for target in watchable {
                let key = target.key();
                let entry_state = if retain.contains(&key) {
                    state
                        .get(&key)
                        .map(|entry| entry.state.clone())
                        .unwrap_or(EntryState::Pending)
                } else {
                    EntryState::Pending
                };
                next.partitions
                    .entry(target.kind.clone())
                    .or_default()
                    .insert(ResourceEntry {
                        key,
                        state: entry_state,
                    });
            }
            next
        }
        StateEvent::Loaded {
            kind,
            name,
            payload,
        } => {
            set_state(&mut state, &kind, &name, EntryState::Loaded(payload));
            state
        }
        StateEvent::Deleted { kind, name } => {
            set_state(&mut state, &kind, &name, EntryState::Pending);
            state
        }
        StateEvent::TransportFailed { kind, name, error } => {
            set_state(&mut state, &kind, &name, EntryState::Errored(error));
            state
        }
        StateEvent::Reset => AggregateState::default(),
    }
}

fn set_state(state: &mut AggregateState, kind: &ResourceKind, name: &str, next: EntryState) {
    if !kind.is_watchable() {
        return;
    }
    let key = resource_key(kind, name);
    if let Some(entry) = state.entry_mut(kind, &key) {
        entry.state = next;
    }
}
