use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Request body for submitting a generation job.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobParams {
    /// Stream id of the listener that should receive status updates
    #[schema(example = "e08ab5d36c6b3e5ff2b7a4e0b0f4f1c7c3a9d3e5b2f6a8c1d4e7f0a3b6c9d2e3")]
    pub stream_id: String,
    /// Generation input forwarded to the worker queue
    #[serde(default)]
    #[schema(value_type = Object)]
    pub input: Value,
}
