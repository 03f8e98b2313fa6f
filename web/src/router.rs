use crate::controller::{health_check_controller, job_controller, webhook_controller};
use crate::{params, sse, websocket, AppState};
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Generation Platform API"
        ),
        paths(
            health_check_controller::health_check,
            job_controller::create,
            webhook_controller::cog_webhook,
            sse::handler::sse_handler,
            websocket::handler::websocket_handler,
        ),
        components(
            schemas(
                health_check_controller::HealthResponse,
                job_controller::JobResponse,
                params::job::CreateJobParams,
                webhook_controller::CogWebhookPayload,
                webhook_controller::WebhookResponse,
            )
        ),
        tags(
            (name = "generation_platform", description = "Generation job submission and live status streaming API")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(job_routes(app_state.clone()))
        .merge(webhook_routes(app_state.clone()))
        .merge(sse_routes(app_state.clone()))
        .merge(websocket_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

fn job_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/jobs", post(job_controller::create))
        .with_state(app_state)
}

// Worker callbacks authenticate with a body signature, not a user session
fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/webhooks/cog", post(webhook_controller::cog_webhook))
        .with_state(app_state)
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse::handler::sse_handler))
        .with_state(app_state)
}

fn websocket_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket::handler::websocket_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    #[test]
    fn test_openapi_lists_every_route() {
        let openapi = ApiDoc::openapi();
        let paths: Vec<&str> = openapi.paths.paths.keys().map(String::as_str).collect();

        for path in ["/health", "/jobs", "/webhooks/cog", "/sse", "/ws"] {
            assert!(paths.contains(&path), "missing {path} in {paths:?}");
        }
    }

    #[test]
    fn test_job_ids_are_documented_as_uuid_strings() {
        let openapi = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let schemas = &openapi["components"]["schemas"];

        for schema in ["JobResponse", "CogWebhookPayload"] {
            let id = &schemas[schema]["properties"]["id"];
            assert_eq!(id["type"], "string", "{schema}.id");
            assert_eq!(id["format"], "uuid", "{schema}.id");
        }
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let response = define_routes(test_state(None))
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["info"]["title"], "Generation Platform API");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = define_routes(test_state(None))
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
