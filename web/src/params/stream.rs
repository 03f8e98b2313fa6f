use crate::Error;
use hub::StreamId;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters accepted when opening an SSE stream.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct SseParams {
    /// 64 character hex stream id the listener subscribes to
    pub(crate) stream: Option<String>,
}

/// Query parameters accepted when opening a WebSocket.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct WebSocketParams {
    /// 64 character hex stream id the listener subscribes to
    pub(crate) websocket_id: Option<String>,
}

fn parse(raw: Option<&str>) -> Result<StreamId, Error> {
    Ok(StreamId::parse(raw.unwrap_or_default())?)
}

impl SseParams {
    pub(crate) fn stream_id(&self) -> Result<StreamId, Error> {
        parse(self.stream.as_deref())
    }
}

impl WebSocketParams {
    pub(crate) fn stream_id(&self) -> Result<StreamId, Error> {
        parse(self.websocket_id.as_deref())
    }
}
