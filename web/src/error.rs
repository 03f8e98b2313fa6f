use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use domain::error::{
    DomainErrorKind, Error as DomainError, InternalErrorKind, InvalidErrorKind, WebhookErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Invalid(invalid_error_kind) => match invalid_error_kind {
                InvalidErrorKind::StreamId => error_response(StatusCode::BAD_REQUEST, "Invalid ID"),
                InvalidErrorKind::Payload => {
                    error_response(StatusCode::BAD_REQUEST, "Invalid payload")
                }
            },
            DomainErrorKind::Webhook(webhook_error_kind) => {
                match webhook_error_kind {
                    WebhookErrorKind::MissingSignature => warn!("Webhook call without signature"),
                    WebhookErrorKind::InvalidSignature => warn!("Webhook call with invalid signature"),
                }
                error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Config => {
                    error!("Internal configuration error: {:?}", self.0.source);
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn render(err: Error) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_stream_id_maps_to_400() {
        let err: Error = hub::StreamId::parse("not-a-hash").unwrap_err().into();
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid ID"}));
    }

    #[tokio::test]
    async fn test_invalid_payload_maps_to_400() {
        let err: Error = serde_json::from_str::<Value>("{").unwrap_err().into();
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid payload"}));
    }

    #[tokio::test]
    async fn test_webhook_errors_map_to_401() {
        let err: Error = DomainError::webhook(WebhookErrorKind::MissingSignature).into();
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Unauthorized"}));
    }
}
