//! Transport seam between the connection manager and live watches
//!
//! A transport opens one connection per `WatchTarget` and reports everything
//! it sees through the `EventSink` it was handed. Messages carry the handle
//! id they were opened under so the manager can reject anything from a
//! connection it already closed.

use crate::error::TransportError;
use crate::manifest::WatchTarget;
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

/// Identity of one opened connection; never reused within a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something a connection observed
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The resource was added or modified
    Applied(Value),
    /// The resource was deleted
    Deleted(Value),
    /// The connection failed
    Error(TransportError),
    /// The connection stopped for good and will deliver nothing more
    Closed,
}

/// Message delivered from a connection to the manager
#[derive(Debug, Clone, PartialEq)]
pub struct WatchMessage {
    pub handle: HandleId,
    pub event: TransportEvent,
}

/// Sending half handed to a transport for one connection
#[derive(Debug, Clone)]
pub struct EventSink {
    handle: HandleId,
    tx: mpsc::UnboundedSender<WatchMessage>,
}

impl EventSink {
    pub fn new(handle: HandleId, tx: mpsc::UnboundedSender<WatchMessage>) -> Self {
        Self { handle, tx }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Deliver an event; returns false once the receiving side is gone
    pub fn send(&self, event: TransportEvent) -> bool {
        self.tx
            .send(WatchMessage {
                handle: self.handle,
                event,
            })
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A running connection that can be shut down
pub trait Connection: Send {
    /// Stop delivering events. Must tolerate repeated calls.
    fn close(&mut self);
}

impl Connection for tokio::task::JoinHandle<()> {
    fn close(&mut self) {
        self.abort();
    }
}

/// Opens live connections for watch targets
#[cfg_attr(test, mockall::automock)]
pub trait WatchTransport: Send + Sync {
    fn open_watch(
        &self,
        target: &WatchTarget,
        sink: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError>;
}
