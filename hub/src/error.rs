//! Error types for the `hub` crate.
//!
//! Hub operations themselves never fail; the only fallible surface is
//! parsing client-supplied routing keys at connection time.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The routing key is not a 64 character hex digest.
    InvalidStreamId,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::InvalidStreamId => write!(f, "Hub error: invalid stream id"),
        }
    }
}

impl StdError for Error {}
