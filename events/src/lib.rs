//! Event system infrastructure for the generation platform.
//!
//! This crate provides the event system that decouples job lifecycle logic
//! (job submission, worker webhooks, deadline watchdogs) from the delivery
//! infrastructure that pushes status updates to listening clients.
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates (hub, domain, etc.),
//! avoiding circular dependencies. Job output data is carried as plain strings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A type alias for the identifier of a generation job.
pub type Id = Uuid;

/// Lifecycle status of a generation job as reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Terminal statuses end a job's lifecycle; no further updates follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Domain events that represent business-level changes in the system.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// Emitted whenever a generation job moves through its lifecycle: on
    /// submission, on every worker callback, and when a job misses its deadline.
    JobStatusChanged {
        /// The job whose status changed.
        job_id: Id,
        /// Client-supplied stream token propagated from job submission. Listeners
        /// connected under this token receive the update. Carried unvalidated;
        /// the delivery layer decides what to do with a malformed value.
        stream_id: String,
        status: JobStatus,
        /// Output locations produced by the worker (empty until the job succeeds).
        outputs: Vec<String>,
        /// Failure reason reported by the worker or the deadline watchdog.
        error: Option<String>,
    },
}

/// Trait for handling domain events.
/// Implementations can perform side effects like pushing notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
