use crate::connection::{Connection, ConnectionId, ConnectionRegistry, Payload};
use crate::stream_id::StreamId;
use log::*;
use std::sync::Arc;

/// Default number of payloads a connection may have queued before it is
/// considered stalled and evicted.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Keyed multicast hub shared by every transport adapter and publisher.
///
/// Construct one per process and hand it around behind an `Arc`.
pub struct Hub {
    registry: Arc<ConnectionRegistry>,
}

impl Hub {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(outbox_capacity)),
        }
    }

    /// Register a new listener for `stream_id`.
    pub fn register(&self, stream_id: StreamId) -> Connection {
        let connection = self.registry.register(stream_id);
        info!(
            "Registered connection {} on stream {} ({} live)",
            connection.id().as_str(),
            connection.stream_id(),
            self.registry.len()
        );
        connection
    }

    /// Remove a listener. Safe to call more than once.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        if self.registry.unregister(connection_id) {
            info!(
                "Unregistered connection {} ({} live)",
                connection_id.as_str(),
                self.registry.len()
            );
        } else {
            trace!(
                "Connection {} already unregistered",
                connection_id.as_str()
            );
        }
    }

    /// Push `payload` to every listener on `stream_id` and return how many
    /// outboxes accepted it. The count is advisory; publishers may ignore it.
    pub fn multicast(&self, stream_id: &StreamId, payload: Payload) -> usize {
        let outcome = self.registry.multicast(stream_id, payload);

        debug!(
            "Multicast on stream {}: delivered={}, evicted={}",
            stream_id, outcome.delivered, outcome.evicted
        );

        outcome.delivered
    }

    /// Whether anyone is currently listening on `stream_id`.
    pub fn has_listeners(&self, stream_id: &StreamId) -> bool {
        self.registry.has_listeners(stream_id)
    }

    pub fn is_registered(&self, connection_id: &ConnectionId) -> bool {
        self.registry.contains(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOX_CAPACITY)
    }
}

/// Unregisters a connection when dropped.
///
/// Transport adapters hold one for the lifetime of a session so that every
/// exit path, including the response stream being dropped on client
/// disconnect, removes the connection from the hub.
pub struct ConnectionGuard {
    hub: Arc<Hub>,
    connection_id: ConnectionId,
}

impl ConnectionGuard {
    pub fn new(hub: Arc<Hub>, connection: &Connection) -> Self {
        Self {
            hub,
            connection_id: connection.id().clone(),
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.hub.unregister(&self.connection_id);
    }
}
