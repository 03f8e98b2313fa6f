use crate::{AppState, Error};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use domain::error::{Error as DomainError, InvalidErrorKind, WebhookErrorKind};
use domain::job::{JobStatus, ReportOutcome, StatusReport};
use domain::webhook::{HmacWebhookValidator, WebhookValidator, SIGNATURE_HEADER};
use domain::Id;
use hub::StreamId;
use log::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status callback sent by a generation worker.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CogWebhookPayload {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub stream_id: String,
    #[schema(value_type = String, example = "succeeded")]
    pub status: JobStatus,
    #[serde(default)]
    pub outputs: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    #[schema(example = "accepted")]
    pub status: String,
}

impl WebhookResponse {
    fn accepted() -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "accepted".to_string(),
            }),
        )
    }

    fn ignored() -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "ignored".to_string(),
            }),
        )
    }
}

/// POST receive a job status callback from a generation worker
///
/// When a webhook secret is configured the raw body must carry a valid
/// `x-webhook-signature: sha256=<hex>` header. Callbacks for jobs that are no
/// longer pending are acknowledged and dropped.
#[utoipa::path(
    post,
    path = "/webhooks/cog",
    request_body = CogWebhookPayload,
    responses(
        (status = 200, description = "Callback accepted or ignored", body = WebhookResponse),
        (status = 400, description = "Malformed payload or stream id"),
        (status = 401, description = "Missing or invalid signature"),
    )
)]
pub async fn cog_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    if let Some(secret) = app_state.config.webhook_secret() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        let validator = HmacWebhookValidator::new(secret.to_string());

        if !validator.validate(signature, &body)? {
            warn!("Webhook signature did not match request body");
            return Err(DomainError::webhook(WebhookErrorKind::InvalidSignature).into());
        }
    }

    let payload: CogWebhookPayload = serde_json::from_slice(&body)?;
    let stream_id = StreamId::parse(&payload.stream_id)?;
    debug!(
        "Worker callback for job {} on stream {stream_id}: {}",
        payload.id, payload.status
    );

    let job_id = payload.id;
    let report = StatusReport {
        job_id,
        stream_id: stream_id.clone(),
        status: payload.status,
        outputs: payload.outputs,
        error: payload.error,
    };

    match app_state.job_tracker.report(report).await {
        ReportOutcome::Published => Ok(WebhookResponse::accepted()),
        ReportOutcome::NotPending => {
            info!("Ignoring callback for job {job_id} which is not pending");
            Ok(WebhookResponse::ignored())
        }
        ReportOutcome::StreamMismatch { expected } => {
            warn!(
                "Callback for job {job_id} names stream {stream_id}, job was submitted for {expected}"
            );
            Err(DomainError::invalid(InvalidErrorKind::Payload).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::{test_state, STREAM};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use domain::webhook::{HmacWebhookValidator, SIGNATURE_HEADER};
    use domain::Id;
    use http_body_util::BodyExt;
    use hub::StreamId;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const OTHER_STREAM: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";

    fn callback(body: &str, signature: Option<&str>) -> Request<Body> {
        let mut request = Request::post("/webhooks/cog")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_callbacks_reach_listener_and_terminal_status_settles_job() {
        let app_state = test_state(None);
        let stream_id = StreamId::parse(STREAM).unwrap();
        let mut listener = app_state.hub.register(stream_id.clone());
        let job_id = Id::new_v4();
        app_state.job_tracker.track(job_id, stream_id);

        let processing = json!({"id": job_id, "stream_id": STREAM, "status": "processing"});
        let response = define_routes(app_state.clone())
            .oneshot(callback(&processing.to_string(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "accepted"}));
        assert_eq!(app_state.job_tracker.pending_count(), 1);

        let succeeded = json!({
            "id": job_id,
            "stream_id": STREAM,
            "status": "succeeded",
            "outputs": ["https://cdn.example/out.png"]
        });
        let response = define_routes(app_state.clone())
            .oneshot(callback(&succeeded.to_string(), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({"status": "accepted"}));
        assert_eq!(app_state.job_tracker.pending_count(), 0);

        let first: Value = serde_json::from_str(&listener.try_recv().unwrap()).unwrap();
        assert_eq!(first["status"], "processing");
        let second: Value = serde_json::from_str(&listener.try_recv().unwrap()).unwrap();
        assert_eq!(second["status"], "succeeded");
        assert_eq!(second["outputs"], json!(["https://cdn.example/out.png"]));
    }

    #[tokio::test]
    async fn test_callback_for_unknown_job_is_ignored() {
        let app_state = test_state(None);
        let mut listener = app_state.hub.register(StreamId::parse(STREAM).unwrap());

        let body = json!({"id": Id::new_v4(), "stream_id": STREAM, "status": "succeeded"});
        let response = define_routes(app_state.clone())
            .oneshot(callback(&body.to_string(), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ignored"}));
        assert!(listener.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_callback_with_mismatched_stream_is_rejected() {
        let app_state = test_state(None);
        let job_id = Id::new_v4();
        app_state
            .job_tracker
            .track(job_id, StreamId::parse(STREAM).unwrap());

        let body = json!({"id": job_id, "stream_id": OTHER_STREAM, "status": "succeeded"});
        let response = define_routes(app_state.clone())
            .oneshot(callback(&body.to_string(), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "Invalid payload"}));
        assert_eq!(app_state.job_tracker.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_callbacks_are_rejected() {
        let app_state = test_state(None);

        let response = define_routes(app_state.clone())
            .oneshot(callback("{\"id\":", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "Invalid payload"}));

        let body = json!({"id": Id::new_v4(), "stream_id": "abc", "status": "failed"});
        let response = define_routes(app_state)
            .oneshot(callback(&body.to_string(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "Invalid ID"}));
    }

    #[tokio::test]
    async fn test_signed_callback_is_accepted() {
        let app_state = test_state(Some("worker-secret"));
        let job_id = Id::new_v4();
        app_state
            .job_tracker
            .track(job_id, StreamId::parse(STREAM).unwrap());

        let body = json!({"id": job_id, "stream_id": STREAM, "status": "failed", "error": "oom"})
            .to_string();
        let signature = HmacWebhookValidator::new("worker-secret".to_string())
            .sign(body.as_bytes())
            .unwrap();

        let response = define_routes(app_state.clone())
            .oneshot(callback(&body, Some(&signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "accepted"}));
        assert_eq!(app_state.job_tracker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unsigned_or_forged_callback_is_unauthorized() {
        let app_state = test_state(Some("worker-secret"));
        let job_id = Id::new_v4();
        app_state
            .job_tracker
            .track(job_id, StreamId::parse(STREAM).unwrap());
        let body = json!({"id": job_id, "stream_id": STREAM, "status": "succeeded"}).to_string();

        let response = define_routes(app_state.clone())
            .oneshot(callback(&body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({"error": "Unauthorized"}));

        let forged = HmacWebhookValidator::new("wrong-secret".to_string())
            .sign(body.as_bytes())
            .unwrap();
        let response = define_routes(app_state.clone())
            .oneshot(callback(&body, Some(&forged)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(app_state.job_tracker.pending_count(), 1);
    }
}
