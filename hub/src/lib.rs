//! Keyed multicast hub for pushing asynchronous job updates to live clients.
//!
//! A client opens a long-lived connection (Server-Sent Events or WebSocket)
//! carrying a stream id, then submits one or more generation jobs carrying the
//! same stream id. When a worker reports back, the service publishes the new
//! status to that stream id and the hub delivers it to every connection
//! registered under it.
//!
//! # Architecture
//!
//! - **Transport agnostic**: the hub moves pre-serialized payloads. Framing
//!   (`data: ...` lines, WebSocket text frames) belongs to the transport adapters
//!   in the `web` crate, so one hub serves both transports.
//! - **Dual-index registry**: connections are stored by connection id and
//!   indexed by stream id via separate DashMap indices.
//! - **Bounded outboxes**: each connection has a bounded queue. Multicast never
//!   waits; a consumer whose queue is full is evicted instead of slowing down
//!   publishers.
//! - **Ephemeral messages**: nothing is persisted or replayed. A client that is
//!   not connected misses the update and falls back to polling.
//!
//! # Message Flow
//!
//! 1. Transport adapter validates the stream id and calls `Hub::register`
//! 2. Adapter holds a `ConnectionGuard` and pumps `Connection::recv` onto the wire
//! 3. A job controller or webhook publishes a `DomainEvent::JobStatusChanged`
//! 4. `HubDomainEventHandler` serializes a `JobStatusMessage` and calls
//!    `Hub::multicast`
//! 5. Guard drop on disconnect removes the connection from the registry
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry, Connection and the bounded outbox
//! - `manager`: `Hub` facade and `ConnectionGuard`
//! - `message`: status payload schema
//! - `stream_id`: routing key validation
//! - `domain_event_handler`: bridge from domain events to multicast

pub mod connection;
pub mod domain_event_handler;
pub mod error;
pub mod manager;
pub mod message;
pub mod stream_id;

pub use connection::{Connection, ConnectionId, Payload};
pub use domain_event_handler::HubDomainEventHandler;
pub use manager::{ConnectionGuard, Hub, DEFAULT_OUTBOX_CAPACITY};
pub use stream_id::StreamId;
