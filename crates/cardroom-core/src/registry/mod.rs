//! Registry of live client connections.
//!
//! The registry is the broadcast target for the game relay. Each connection
//! owns a bounded `mpsc` queue; the websocket task drains it and writes
//! frames to the socket.

use std::fmt;
use std::sync::Arc;

use cardroom_types::event::ServerEvent;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier of one client connection (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from unicast delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection {0} is not registered")]
    NotConnected(ConnectionId),

    #[error("outbound queue full for connection {0}")]
    QueueFull(ConnectionId),

    #[error("connection {0} closed")]
    Closed(ConnectionId),
}

/// A freshly registered connection: its id and the receiving end of its queue.
pub struct Connection {
    pub id: ConnectionId,
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Cloneable handle to the set of connected clients.
#[derive(Clone)]
pub struct ConnectionRegistry {
    senders: Arc<DashMap<ConnectionId, mpsc::Sender<ServerEvent>>>,
    buffer: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry; `buffer` is the per-connection queue length.
    pub fn new(buffer: usize) -> Self {
        Self {
            senders: Arc::new(DashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new connection and return its outbound queue.
    pub fn register(&self) -> Connection {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.senders.insert(id, tx);
        debug!(connection_id = %id, total = self.senders.len(), "connection registered");
        Connection { id, events: rx }
    }

    /// Drop a connection's sender. Returns `true` if it was registered.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        let removed = self.senders.remove(id).is_some();
        if removed {
            debug!(connection_id = %id, total = self.senders.len(), "connection unregistered");
        }
        removed
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.senders.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Enqueue an event for every connection.
    ///
    /// Returns the number of connections the event was queued for. Closed
    /// connections are pruned; a full queue skips this event for that
    /// connection only.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.senders.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        connection_id = %entry.key(),
                        event = event.name(),
                        "outbound queue full, dropping event for slow connection"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        for id in closed {
            self.senders.remove(&id);
            debug!(connection_id = %id, "pruned closed connection");
        }

        delivered
    }

    /// Enqueue an event for a single connection.
    pub fn send_to(&self, id: &ConnectionId, event: ServerEvent) -> Result<(), RegistryError> {
        let sender = self
            .senders
            .get(id)
            .map(|s| s.value().clone())
            .ok_or(RegistryError::NotConnected(*id))?;

        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(RegistryError::QueueFull(*id)),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.senders.remove(id);
                Err(RegistryError::Closed(*id))
            }
        }
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.senders.len())
            .field("buffer", &self.buffer)
            .finish()
    }
}
