//! Generation job lifecycle tracking.
//!
//! Jobs are dispatched to external workers which report back through the
//! worker webhook. The tracker remembers which jobs are still waiting on a
//! terminal callback and fails them on behalf of the worker if the callback
//! never arrives.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use events::{DomainEvent, EventPublisher, Id};
use hub::StreamId;
use log::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

pub use events::JobStatus;

/// Error reported to listeners when a job misses its deadline.
pub const TIMEOUT_ERROR: &str = "timeout";

/// Default time a job may wait for a terminal worker callback.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct PendingJob {
    stream_id: StreamId,
    generation: u64,
    watchdog: AbortHandle,
    /// Held while a status for this job is checked and published, by worker
    /// reports and by the watchdog alike.
    gate: Arc<Mutex<()>>,
}

/// A worker's status update for a tracked job.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub job_id: Id,
    pub stream_id: StreamId,
    pub status: JobStatus,
    pub outputs: Vec<String>,
    pub error: Option<String>,
}

/// What `JobTracker::report` did with a status update.
#[derive(Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    Published,
    /// Unknown, already settled or already timed out. Nothing was published.
    NotPending,
    /// The report names a different stream than the job was submitted under.
    StreamMismatch { expected: StreamId },
}

/// Tracks jobs awaiting a terminal status and publishes a synthetic failure
/// for any job whose deadline passes first.
#[derive(Clone)]
pub struct JobTracker {
    pending: Arc<DashMap<Id, PendingJob>>,
    generations: Arc<AtomicU64>,
    publisher: EventPublisher,
    timeout: Duration,
}

impl JobTracker {
    pub fn new(publisher: EventPublisher, timeout: Duration) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            generations: Arc::new(AtomicU64::new(0)),
            publisher,
            timeout,
        }
    }

    /// Start the deadline for `job_id`. Tracking an id that is already pending
    /// restarts its deadline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track(&self, job_id: Id, stream_id: StreamId) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);

        // The entry guard is held while spawning so the watchdog cannot look
        // the job up before it has been inserted.
        match self.pending.entry(job_id) {
            Entry::Occupied(mut occupied) => {
                occupied.get().watchdog.abort();
                let gate = Arc::clone(&occupied.get().gate);
                let watchdog = self.spawn_watchdog(job_id, stream_id.clone(), generation);
                occupied.insert(PendingJob {
                    stream_id,
                    generation,
                    watchdog,
                    gate,
                });
            }
            Entry::Vacant(vacant) => {
                let watchdog = self.spawn_watchdog(job_id, stream_id.clone(), generation);
                vacant.insert(PendingJob {
                    stream_id,
                    generation,
                    watchdog,
                    gate: Arc::new(Mutex::new(())),
                });
            }
        }

        debug!(
            "Tracking job {job_id} with a {}s deadline",
            self.timeout.as_secs()
        );
    }

    fn spawn_watchdog(&self, job_id: Id, stream_id: StreamId, generation: u64) -> AbortHandle {
        let pending = Arc::clone(&self.pending);
        let publisher = self.publisher.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let Some(gate) = pending.get(&job_id).map(|job| Arc::clone(&job.gate)) else {
                return;
            };
            let _held = gate.lock().await;

            // A re-track replaces the entry with a newer generation
            if pending
                .remove_if(&job_id, |_, job| job.generation == generation)
                .is_none()
            {
                return;
            }

            warn!("Job {job_id} received no terminal callback within {timeout:?}, failing it");
            publisher
                .publish(DomainEvent::JobStatusChanged {
                    job_id,
                    stream_id: stream_id.to_string(),
                    status: JobStatus::Failed,
                    outputs: vec![],
                    error: Some(TIMEOUT_ERROR.to_string()),
                })
                .await;
        })
        .abort_handle()
    }

    /// Publish a worker's status update if its job is still pending. A
    /// terminal status settles the job and cancels its deadline.
    ///
    /// The pending check and the publish happen under the job's gate, so an
    /// update is never published after the watchdog has failed the job.
    pub async fn report(&self, report: StatusReport) -> ReportOutcome {
        let Some(gate) = self
            .pending
            .get(&report.job_id)
            .map(|job| Arc::clone(&job.gate))
        else {
            return ReportOutcome::NotPending;
        };
        let _held = gate.lock().await;

        let submitted_to = self
            .pending
            .get(&report.job_id)
            .map(|job| job.stream_id.clone());
        match submitted_to {
            None => return ReportOutcome::NotPending,
            Some(expected) if expected != report.stream_id => {
                return ReportOutcome::StreamMismatch { expected }
            }
            Some(_) => {}
        }

        if report.status.is_terminal() {
            self.settle(&report.job_id);
        }

        self.publisher
            .publish(DomainEvent::JobStatusChanged {
                job_id: report.job_id,
                stream_id: report.stream_id.to_string(),
                status: report.status,
                outputs: report.outputs,
                error: report.error,
            })
            .await;

        ReportOutcome::Published
    }

    fn settle(&self, job_id: &Id) {
        if let Some((_, job)) = self.pending.remove(job_id) {
            job.watchdog.abort();
            debug!("Settled job {job_id} on stream {}", job.stream_id);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
