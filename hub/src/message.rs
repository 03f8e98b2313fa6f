use crate::connection::Payload;
use events::JobStatus;
use serde::Serialize;
use std::sync::Arc;

/// Job status update pushed to listeners of a stream.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusMessage {
    pub id: String,
    pub stream_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusMessage {
    /// Serialize into a payload ready for multicast.
    pub fn to_payload(&self) -> Result<Payload, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}
