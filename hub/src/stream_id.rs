use crate::error::{Error, ErrorKind};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Length of a hex encoded SHA-256 digest.
pub const STREAM_ID_LEN: usize = 64;

/// Client-chosen routing key linking a listening connection to later job results.
///
/// A stream id is a correlation token, not a credential. It must look like a
/// hex encoded SHA-256 digest; uniqueness is not enforced, so two listeners that
/// pick the same id both receive every message published to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn parse(value: &str) -> Result<Self, Error> {
        if value.len() == STREAM_ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error {
                error_kind: ErrorKind::InvalidStreamId,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StreamId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
