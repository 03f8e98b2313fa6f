use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Event {
    pub data: Value,
    pub timestamp: Instant,
}

impl Event {
    pub fn job_id(&self) -> Option<&str> {
        self.data["id"].as_str()
    }

    pub fn status(&self) -> Option<&str> {
        self.data["status"].as_str()
    }
}

pub struct Connection {
    pub label: String,
    pub stream_id: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

/// Generate a fresh 64 character hex stream id.
pub fn random_stream_id() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

impl Connection {
    pub async fn establish(base_url: &str, stream_id: &str, label: String) -> Result<Self> {
        let url = format!("{}/sse?stream={}", base_url, stream_id);
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(&url)?.build();

        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => match serde_json::from_str(&event.data) {
                        Ok(data) => {
                            let event = Event {
                                data,
                                timestamp: Instant::now(),
                            };

                            if tx.send(event).is_err() {
                                debug!("Stream receiver dropped for {}", task_label);
                                break;
                            }
                        }
                        Err(e) => warn!("Non JSON payload for {}: {}", task_label, e),
                    },
                    Some(Ok(es::SSE::Comment(_))) => {
                        // Keep-alive
                    }
                    Some(Err(e)) => {
                        warn!("Stream error for {}: {}", task_label, e);
                    }
                    None => {
                        debug!("Stream ended for {}", task_label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            label,
            stream_id: stream_id.to_string(),
            event_rx: rx,
            _handle: handle,
        })
    }

    /// Wait for the status update of `job_id` reporting `status`, skipping any
    /// other traffic on the stream.
    pub async fn wait_for_status(
        &mut self,
        job_id: &str,
        status: &str,
        timeout: Duration,
    ) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for {} on job {}", status, job_id);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event))
                    if event.job_id() == Some(job_id) && event.status() == Some(status) =>
                {
                    return Ok(event);
                }
                Ok(Some(_)) => {
                    // Another job or status, keep waiting
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("Stream connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for {} on job {}", status, job_id);
                }
            }
        }
    }
}
