//! This module holds typed parameters for various endpoint inputs.
//!
//! Stream ids arrive as plain strings and are validated by the handlers rather
//! than during deserialization, so that a malformed or missing id produces the
//! same JSON error body as every other client error instead of a framework
//! rejection.

pub(crate) mod job;
pub(crate) mod stream;
