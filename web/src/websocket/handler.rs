use crate::params::stream::WebSocketParams;
use crate::AppState;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{Sink, SinkExt, Stream, StreamExt};
use hub::{Connection, ConnectionGuard, StreamId};
use log::*;
use std::fmt::Display;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

/// Replies queued by the read pump for the write pump (pongs to text pings).
const REPLY_CAPACITY: usize = 8;

/// GET open a WebSocket for a stream id
///
/// The stream id is validated before the upgrade is attempted, so a malformed id
/// is answered with a JSON error instead of a protocol switch.
#[utoipa::path(
    get,
    path = "/ws",
    params(WebSocketParams),
    responses(
        (status = 101, description = "WebSocket connection upgraded"),
        (status = 400, description = "Missing or malformed stream id"),
    )
)]
pub async fn websocket_handler(
    State(app_state): State<AppState>,
    Query(params): Query<WebSocketParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let stream_id = match params.stream_id() {
        Ok(stream_id) => stream_id,
        Err(e) => return e.into_response(),
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            debug!("WebSocket upgrade rejected for stream {stream_id}: {rejection}");
            return rejection.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, app_state, stream_id))
}

/// Drive one upgraded socket until either pump finishes.
async fn handle_socket(socket: WebSocket, app_state: AppState, stream_id: StreamId) {
    let connection = app_state.hub.register(stream_id);
    let _guard = ConnectionGuard::new(app_state.hub.clone(), &connection);
    let connection_label = connection.id().as_str().to_string();

    let (sender, receiver) = socket.split();
    let (reply_tx, reply_rx) = mpsc::channel(REPLY_CAPACITY);
    let ping_every = app_state.config.ws_ping_interval();

    let mut write_task = tokio::spawn(write_pump(sender, connection, reply_rx, ping_every));
    let mut read_task = tokio::spawn(read_pump(receiver, reply_tx));

    select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    info!("WebSocket connection {connection_label} closed");
}

/// Drain the connection's outbox onto the socket, answer queued replies and
/// keep the socket alive with periodic pings.
///
/// Returns when the outbox closes (the hub dropped the connection), the read
/// pump goes away, or a write fails.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut connection: Connection,
    mut replies: mpsc::Receiver<Message>,
    ping_every: Duration,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let ping_every = ping_every.max(Duration::from_secs(1));
    let mut ping = interval_at(Instant::now() + ping_every, ping_every);

    loop {
        select! {
            payload = connection.recv() => {
                let Some(payload) = payload else {
                    debug!(
                        "Outbox closed for connection {}, closing socket",
                        connection.id().as_str()
                    );
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };

                if let Err(e) = sink.send(Message::Text(payload.to_string().into())).await {
                    debug!("Failed to write to socket, client likely disconnected: {e}");
                    break;
                }
            }

            reply = replies.recv() => {
                // The read pump is gone
                let Some(reply) = reply else { break };

                if let Err(e) = sink.send(reply).await {
                    debug!("Failed to send reply: {e}");
                    break;
                }
            }

            _ = ping.tick() => {
                trace!("Sending ping to connection {}", connection.id().as_str());
                if let Err(e) = sink.send(Message::Ping(Vec::<u8>::new().into())).await {
                    debug!("Failed to send ping, client likely disconnected: {e}");
                    break;
                }
            }
        }
    }
}

/// Consume control frames from the client until it closes or errors.
pub(crate) async fn read_pump<S, E>(mut stream: S, replies: mpsc::Sender<Message>)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) => {
                debug!("Client sent close frame");
                break;
            }
            Ok(Message::Text(text)) if text.as_str().trim() == "ping" => {
                if replies.try_send(Message::Text("pong".into())).is_err() {
                    debug!("Reply queue full, dropping pong");
                }
            }
            Ok(Message::Pong(_)) => trace!("Received pong from client"),
            Ok(_) => trace!("Ignoring inbound frame"),
            Err(e) => {
                debug!("WebSocket read error: {e}");
                break;
            }
        }
    }
}
