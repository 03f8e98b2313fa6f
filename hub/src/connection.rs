use crate::stream_id::StreamId;
use dashmap::DashMap;
use log::*;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

/// Pre-serialized message body. The hub never inspects it; transports frame it.
pub type Payload = Arc<str>;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The consuming side of one live transport session.
///
/// Owned by the transport adapter that accepted the client. The registry only
/// keeps the sending half of the outbox, so once the connection is
/// unregistered the outbox drains whatever is left and then yields `None`.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    stream_id: StreamId,
    outbox: Receiver<Payload>,
}

impl Connection {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Wait for the next queued payload. Returns `None` once the connection has
    /// been unregistered and its outbox is drained.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.outbox.recv().await
    }

    /// Take the next queued payload without waiting.
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.outbox.try_recv().ok()
    }
}

/// Registry entry: the producing half of a connection's outbox.
#[derive(Debug)]
struct Member {
    stream_id: StreamId,
    sender: Sender<Payload>,
}

/// Result of a single multicast pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MulticastOutcome {
    pub delivered: usize,
    pub evicted: usize,
}

/// Connection registry with dual indices: one for registration/cleanup by
/// connection id and one for routing by stream id.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup
    connections: DashMap<ConnectionId, Member>,

    /// Secondary index: connections sharing a stream id, for message routing
    stream_index: DashMap<StreamId, HashSet<ConnectionId>>,

    /// Capacity of every connection's outbox
    outbox_capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            stream_index: DashMap::new(),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Register a new connection under `stream_id` and hand back its consuming side.
    pub fn register(&self, stream_id: StreamId) -> Connection {
        let connection_id = ConnectionId::new();
        let (sender, outbox) = mpsc::channel(self.outbox_capacity);

        self.connections.insert(
            connection_id.clone(),
            Member {
                stream_id: stream_id.clone(),
                sender,
            },
        );

        self.stream_index
            .entry(stream_id.clone())
            .or_default()
            .insert(connection_id.clone());

        Connection {
            id: connection_id,
            stream_id,
            outbox,
        }
    }

    /// Unregister a connection. Returns `false` if it was already gone.
    ///
    /// Dropping the removed member drops the only sender of the outbox, which is
    /// what closes it, so an outbox can only ever be closed once.
    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        let Some((_, member)) = self.connections.remove(connection_id) else {
            return false;
        };

        if let Some(mut ids) = self.stream_index.get_mut(&member.stream_id) {
            ids.remove(connection_id);
        }
        // A concurrent register may have refilled the set in between.
        self.stream_index
            .remove_if(&member.stream_id, |_, ids| ids.is_empty());

        true
    }

    /// Deliver `payload` to every connection registered under `stream_id`.
    ///
    /// Never waits on a consumer: a connection whose outbox is full, or whose
    /// consumer has gone away, is evicted once the pass completes.
    pub fn multicast(&self, stream_id: &StreamId, payload: Payload) -> MulticastOutcome {
        let targets: Vec<ConnectionId> = match self.stream_index.get(stream_id) {
            Some(ids) => ids.iter().cloned().collect(),
            None => return MulticastOutcome::default(),
        };

        let mut outcome = MulticastOutcome::default();
        let mut stalled = Vec::new();

        for connection_id in targets {
            let attempt = self
                .connections
                .get(&connection_id)
                .map(|member| member.sender.try_send(payload.clone()));

            match attempt {
                // Unregistered after the snapshot was taken
                None => {}
                Some(Ok(())) => outcome.delivered += 1,
                Some(Err(TrySendError::Full(_))) => {
                    warn!(
                        "Outbox full for connection {} on stream {}. Evicting stalled consumer.",
                        connection_id.as_str(),
                        stream_id
                    );
                    stalled.push(connection_id);
                }
                Some(Err(TrySendError::Closed(_))) => {
                    debug!(
                        "Consumer for connection {} is gone. Cleaning up.",
                        connection_id.as_str()
                    );
                    stalled.push(connection_id);
                }
            }
        }

        for connection_id in stalled {
            if self.unregister(&connection_id) {
                outcome.evicted += 1;
            }
        }

        outcome
    }

    pub fn has_listeners(&self, stream_id: &StreamId) -> bool {
        self.stream_index
            .get(stream_id)
            .map(|ids| !ids.is_empty())
            .unwrap_or(false)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
