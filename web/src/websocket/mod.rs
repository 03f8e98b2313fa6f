//! WebSocket transport for the web layer.
//!
//! Each socket is split into a read pump and a write pump running as separate
//! tasks. They share nothing but the reply channel; when either one finishes
//! the other is aborted and the connection leaves the hub.

pub mod handler;
