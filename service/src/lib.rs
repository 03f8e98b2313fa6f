use config::Config;
use domain::job::JobTracker;
use events::EventPublisher;
use hub::{Hub, HubDomainEventHandler};
use log::info;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub hub: Arc<Hub>,
    pub event_publisher: EventPublisher,
    pub job_tracker: JobTracker,
}

impl AppState {
    /// Wire the hub, the event publisher feeding it and the job deadline
    /// tracker publishing through it.
    pub fn new(app_config: Config) -> Self {
        info!(
            "Hub config: outbox_capacity={}, job_timeout={}s",
            app_config.outbox_capacity, app_config.job_timeout_secs
        );

        let hub = Arc::new(Hub::new(app_config.outbox_capacity));
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(HubDomainEventHandler::new(Arc::clone(&hub))));
        let job_tracker = JobTracker::new(event_publisher.clone(), app_config.job_timeout());

        Self {
            config: app_config,
            hub,
            event_publisher,
            job_tracker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use events::{DomainEvent, JobStatus};
    use hub::StreamId;

    #[tokio::test]
    async fn test_published_events_reach_hub_listeners() {
        let config = Config::try_parse_from(["generation_platform_rs"]).unwrap();
        let app_state = AppState::new(config);
        let stream_id = StreamId::parse(&"0f".repeat(32)).unwrap();
        let mut connection = app_state.hub.register(stream_id.clone());

        app_state
            .event_publisher
            .publish(DomainEvent::JobStatusChanged {
                job_id: events::Id::new_v4(),
                stream_id: stream_id.to_string(),
                status: JobStatus::Processing,
                outputs: vec![],
                error: None,
            })
            .await;

        let payload = connection.try_recv().expect("status pushed to listener");
        assert!(payload.contains("\"status\":\"processing\""));
    }
}
