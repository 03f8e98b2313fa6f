use crate::params::job::CreateJobParams;
use crate::{AppState, Error};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::error::{Error as DomainError, InvalidErrorKind};
use domain::job::JobStatus;
use domain::Id;
use events::DomainEvent;
use hub::StreamId;
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub stream_id: String,
    #[schema(value_type = String, example = "queued")]
    pub status: JobStatus,
}

/// POST submit a generation job
///
/// The job is handed to the worker queue and tracked until a worker reports a
/// terminal status. Listeners on `stream_id` receive a `queued` update right
/// away and every later status change.
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = CreateJobParams,
    responses(
        (status = 202, description = "Job accepted", body = JobResponse),
        (status = 400, description = "Malformed body or stream id"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    payload: Result<Json<CreateJobParams>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(params) = payload.map_err(|rejection| {
        debug!("Rejected job submission: {rejection}");
        DomainError::invalid(InvalidErrorKind::Payload)
    })?;
    let stream_id = StreamId::parse(&params.stream_id)?;
    let job_id = Id::new_v4();

    debug!(
        "POST Create job {job_id} for stream {stream_id} with input {}",
        params.input
    );

    app_state.job_tracker.track(job_id, stream_id.clone());
    app_state
        .event_publisher
        .publish(DomainEvent::JobStatusChanged {
            job_id,
            stream_id: stream_id.to_string(),
            status: JobStatus::Queued,
            outputs: vec![],
            error: None,
        })
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse {
            id: job_id,
            stream_id: stream_id.to_string(),
            status: JobStatus::Queued,
        }),
    ))
}
