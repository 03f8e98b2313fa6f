use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Live SSE and WebSocket listeners
    pub connections: usize,
    /// Jobs still waiting on a terminal worker callback
    pub pending_jobs: usize,
}

/// GET report service health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API router is up and responding to requests", body = HealthResponse),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            connections: app_state.hub.connection_count(),
            pending_jobs: app_state.job_tracker.pending_count(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::{test_state, STREAM};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use hub::StreamId;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_live_connections() {
        let app_state = test_state(None);
        let _connection = app_state.hub.register(StreamId::parse(STREAM).unwrap());

        let response = define_routes(app_state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({"status": "healthy", "connections": 1, "pending_jobs": 0})
        );
    }
}
