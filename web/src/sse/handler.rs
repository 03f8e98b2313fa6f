use crate::params::stream::SseParams;
use crate::{AppState, Error};
use async_stream::stream;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use hub::ConnectionGuard;
use log::*;
use std::borrow::Cow;
use std::convert::Infallible;

/// GET open a Server-Sent Events stream for a stream id
///
/// Every payload multicast to the stream id is written as a single
/// `data: <payload>` event. The connection leaves the hub when the client goes
/// away or the hub evicts it.
#[utoipa::path(
    get,
    path = "/sse",
    params(SseParams),
    responses(
        (status = 200, description = "Event stream established", content_type = "text/event-stream"),
        (status = 400, description = "Missing or malformed stream id"),
    )
)]
pub async fn sse_handler(
    State(app_state): State<AppState>,
    Query(params): Query<SseParams>,
) -> Result<impl IntoResponse, Error> {
    let stream_id = params.stream_id()?;
    debug!("Establishing SSE connection for stream {stream_id}");

    let mut connection = app_state.hub.register(stream_id);
    let guard = ConnectionGuard::new(app_state.hub.clone(), &connection);

    // The guard lives inside the stream so that dropping the response body on
    // client disconnect unregisters the connection.
    let stream = stream! {
        let _guard = guard;

        while let Some(payload) = connection.recv().await {
            let data = normalize_line_breaks(&payload);
            yield Ok::<Event, Infallible>(Event::default().data(data.as_ref()));
        }

        debug!(
            "Outbox closed for SSE connection {}, ending stream",
            connection.id().as_str()
        );
    };

    let sse = Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(app_state.config.sse_keep_alive()));

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        sse,
    ))
}

/// Rewrite `\r\n` and lone `\r` as `\n` so every payload line becomes its own
/// `data:` field and clients rejoin the lines with `\n`.
fn normalize_line_breaks(payload: &str) -> Cow<'_, str> {
    if payload.contains('\r') {
        Cow::Owned(payload.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(payload)
    }
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::{test_state, STREAM};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use hub::StreamId;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tower::ServiceExt;

    async fn next_frame(body: &mut Body) -> String {
        let frame = timeout(Duration::from_secs(2), body.frame())
            .await
            .expect("frame within timeout")
            .expect("stream still open")
            .unwrap();
        String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_sse_delivers_multicast_payload_as_data_frame() {
        let app_state = test_state(None);
        let stream_id = StreamId::parse(STREAM).unwrap();

        let response = define_routes(app_state.clone())
            .oneshot(
                Request::get(format!("/sse?stream={STREAM}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
        assert!(app_state.hub.has_listeners(&stream_id));

        let delivered = app_state
            .hub
            .multicast(&stream_id, Arc::from(r#"{"status":"succeeded"}"#));
        assert_eq!(delivered, 1);

        let mut body = response.into_body();
        assert_eq!(
            next_frame(&mut body).await,
            "data: {\"status\":\"succeeded\"}\n\n"
        );
    }

    #[tokio::test]
    async fn test_sse_splits_carriage_returns_into_data_lines() {
        let app_state = test_state(None);
        let stream_id = StreamId::parse(STREAM).unwrap();

        let response = define_routes(app_state.clone())
            .oneshot(
                Request::get(format!("/sse?stream={STREAM}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        app_state
            .hub
            .multicast(&stream_id, Arc::from("line1\r\nline2\rline3"));

        let mut body = response.into_body();
        assert_eq!(
            next_frame(&mut body).await,
            "data: line1\ndata: line2\ndata: line3\n\n"
        );
    }

    #[tokio::test]
    async fn test_sse_preserves_publish_order() {
        let app_state = test_state(None);
        let stream_id = StreamId::parse(STREAM).unwrap();

        let response = define_routes(app_state.clone())
            .oneshot(
                Request::get(format!("/sse?stream={STREAM}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        app_state.hub.multicast(&stream_id, Arc::from("m1"));
        app_state.hub.multicast(&stream_id, Arc::from("m2"));

        let mut body = response.into_body();
        assert_eq!(next_frame(&mut body).await, "data: m1\n\n");
        assert_eq!(next_frame(&mut body).await, "data: m2\n\n");
    }

    #[tokio::test]
    async fn test_sse_rejects_malformed_stream_id() {
        let app_state = test_state(None);

        let response = define_routes(app_state.clone())
            .oneshot(
                Request::get("/sse?stream=not-a-hash")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"error": "Invalid ID"}));
        assert_eq!(app_state.hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_rejects_missing_stream_id() {
        let app_state = test_state(None);

        let response = define_routes(app_state.clone())
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app_state.hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_response_unregisters_connection() {
        let app_state = test_state(None);
        let stream_id = StreamId::parse(STREAM).unwrap();

        let response = define_routes(app_state.clone())
            .oneshot(
                Request::get(format!("/sse?stream={STREAM}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(app_state.hub.connection_count(), 1);

        drop(response);

        assert_eq!(app_state.hub.connection_count(), 0);
        assert!(!app_state.hub.has_listeners(&stream_id));
    }

    #[tokio::test]
    async fn test_sse_stream_ends_when_hub_evicts_connection() {
        let app_state = test_state(None);
        let stream_id = StreamId::parse(STREAM).unwrap();

        let response = define_routes(app_state.clone())
            .oneshot(
                Request::get(format!("/sse?stream={STREAM}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Saturate the outbox without reading, then overflow it
        for _ in 0..app_state.config.outbox_capacity {
            app_state.hub.multicast(&stream_id, Arc::from("x"));
        }
        assert_eq!(app_state.hub.multicast(&stream_id, Arc::from("overflow")), 0);
        assert!(!app_state.hub.has_listeners(&stream_id));

        // Queued frames drain, then the stream finishes
        let body = timeout(Duration::from_secs(2), response.into_body().collect())
            .await
            .expect("stream finishes after eviction")
            .unwrap()
            .to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(
            text.matches("data: x\n\n").count(),
            app_state.config.outbox_capacity
        );
        assert!(!text.contains("overflow"));
    }
}
