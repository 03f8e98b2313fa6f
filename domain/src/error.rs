//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree with `domain::error::Error`
/// as the root type holding an `error_kind` that classifies what went wrong, and
/// an optional `source` holding the original error. Lower layers (`hub`,
/// `serde_json`) are translated into domain kinds here so that `web` only has to
/// map domain kinds onto HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// Client supplied input that cannot be acted on.
    Invalid(InvalidErrorKind),
    /// A webhook request failed signature verification.
    Webhook(WebhookErrorKind),
    Internal(InternalErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum InvalidErrorKind {
    StreamId,
    Payload,
}

#[derive(Debug, PartialEq)]
pub enum WebhookErrorKind {
    MissingSignature,
    InvalidSignature,
}

#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
}

impl Error {
    pub fn invalid(kind: InvalidErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Invalid(kind),
        }
    }

    pub fn webhook(kind: WebhookErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Webhook(kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<hub::error::Error> for Error {
    fn from(err: hub::error::Error) -> Self {
        let error_kind = match err.error_kind {
            hub::error::ErrorKind::InvalidStreamId => {
                DomainErrorKind::Invalid(InvalidErrorKind::StreamId)
            }
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Invalid(InvalidErrorKind::Payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_stream_id_translates_to_invalid_kind() {
        let err: Error = hub::StreamId::parse("nope").unwrap_err().into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Invalid(InvalidErrorKind::StreamId)
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_json_error_translates_to_invalid_payload() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Invalid(InvalidErrorKind::Payload)
        );
    }
}
