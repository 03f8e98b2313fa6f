//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for SSE endpoints.
//! The hub itself (registry, multicast, message types) lives in the `hub`
//! crate and is shared with the WebSocket transport.

pub mod handler;
