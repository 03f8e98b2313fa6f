use crate::message::JobStatusMessage;
use crate::stream_id::StreamId;
use crate::Hub;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by converting them to status payloads and
/// multicasting them to the listeners of the affected stream.
///
/// The publisher decides which stream an event belongs to; this handler only
/// routes. Events for streams nobody is listening on are dropped before any
/// serialization happens.
pub struct HubDomainEventHandler {
    hub: Arc<Hub>,
}

impl HubDomainEventHandler {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl EventHandler for HubDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::JobStatusChanged {
                job_id,
                stream_id,
                status,
                outputs,
                error,
            } => {
                let Ok(key) = StreamId::parse(stream_id) else {
                    warn!("Dropping {status} update for job {job_id}: malformed stream id");
                    return;
                };

                if !self.hub.has_listeners(&key) {
                    debug!("No listeners on stream {key} for job {job_id} ({status})");
                    return;
                }

                let message = JobStatusMessage {
                    id: job_id.to_string(),
                    stream_id: stream_id.clone(),
                    status: *status,
                    outputs: outputs.clone(),
                    error: error.clone(),
                };

                match message.to_payload() {
                    Ok(payload) => {
                        let delivered = self.hub.multicast(&key, payload);
                        debug!("Sent {status} for job {job_id} to {delivered} listener(s)");
                    }
                    Err(e) => error!("Failed to serialize job status message: {e}"),
                }
            }
        }
    }
}
