//! Dispatcher - runs one queued job to a terminal outcome
//!
//! `dispatch` never returns an error and never lets a processor panic
//! escape. Every failure ends as either a scheduled retry or a terminal
//! `failed` backing job.

use crate::application::queue::SharedQueue;
use crate::application::registry::ProcessorRegistry;
use crate::application::retry;
use crate::application::status::{JobStatusService, STATUS_RECORDED_MARKER};
use crate::domain::{JobStatus, ProcessError, ProcessResult, QueuedJob};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const RETRY_SCHEDULED_SUFFIX: &str = "(Re-enqueued for retry)";
pub const RETRY_EXHAUSTED_SUFFIX: &str = "(Max retry attempts reached)";

pub struct Dispatcher {
    registry: Arc<ProcessorRegistry>,
    status: Arc<JobStatusService>,
    queue: SharedQueue,
    processor_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ProcessorRegistry>,
        status: Arc<JobStatusService>,
        queue: SharedQueue,
    ) -> Self {
        Self {
            registry,
            status,
            queue,
            processor_timeout: None,
        }
    }

    /// Abort processor calls that run longer than `timeout`
    pub fn with_processor_timeout(mut self, timeout: Duration) -> Self {
        self.processor_timeout = Some(timeout);
        self
    }

    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    /// Execute `job` once
    pub async fn dispatch(&self, job: QueuedJob) -> ProcessResult {
        let Some(processor) = self.registry.get_processor(&job.job_type) else {
            let message = format!("No processor registered for job type: {}", job.job_type);
            error!(
                queue_id = %job.id,
                job_type = %job.job_type,
                "No processor registered"
            );
            self.record_failure(&job, &message).await;
            return ProcessResult::failure(message.clone(), ProcessError::configuration(message))
                .with_should_retry(false);
        };

        info!(
            queue_id = %job.id,
            job_type = %job.job_type,
            processor = processor.name(),
            attempt = job.attempt,
            background_job_id = ?job.background_job_id(),
            "Dispatching job"
        );

        let mut result = self.run_processor(processor, &job).await;
        if result.success {
            debug!(queue_id = %job.id, "Job processed successfully");
            return result;
        }

        if result.status_recorded || result.message.contains(STATUS_RECORDED_MARKER) {
            debug!(queue_id = %job.id, "Processor already recorded status");
        } else {
            self.record_failure(&job, result.error_text()).await;
        }

        let decision = retry::classify(&result);
        info!(
            queue_id = %job.id,
            retryable = decision.retryable,
            reason = ?decision.reason,
            error = %result.error_text(),
            "Classified job failure"
        );

        if decision.retryable {
            if self.backing_job_canceled(&job).await {
                info!(queue_id = %job.id, "Backing job canceled, not retrying");
                return result.with_should_retry(false);
            }
            if !self.schedule_retry(&job, &mut result).await {
                return result.with_should_retry(false);
            }
        }

        result.should_retry = Some(decision.retryable);
        result
    }

    async fn run_processor(
        &self,
        processor: Arc<dyn crate::port::Processor>,
        job: &QueuedJob,
    ) -> ProcessResult {
        let payload = job.payload.clone();

        // Spawned so a processor panic surfaces as a JoinError
        let mut handle =
            tokio::task::spawn(async move { processor.process(&payload).await });

        let joined = match self.processor_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    warn!(
                        queue_id = %job.id,
                        timeout_ms = limit.as_millis() as u64,
                        "Processor timed out"
                    );
                    let err = ProcessError::transient(format!(
                        "processor timeout after {}ms",
                        limit.as_millis()
                    ));
                    return ProcessResult::failure(err.message.clone(), err);
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(queue_id = %job.id, error = %err, kind = ?err.kind, "Processor returned error");
                ProcessResult::failure(err.message.clone(), err)
            }
            Err(join_err) if join_err.is_panic() => {
                let message = format!("Processor panicked: {}", panic_message(join_err.into_panic()));
                error!(queue_id = %job.id, error = %message, "Processor panicked");
                ProcessResult::failure(message.clone(), ProcessError::permanent(message))
            }
            Err(join_err) => {
                error!(queue_id = %job.id, error = ?join_err, "Processor task cancelled");
                let err = ProcessError::unclassified(format!("Processor task cancelled: {}", join_err));
                ProcessResult::failure(err.message.clone(), err)
            }
        }
    }

    /// Re-enqueue `job` and move its backing job back to queued.
    /// Returns false if the retry was withdrawn because the backing job was
    /// canceled in the meantime.
    async fn schedule_retry(&self, job: &QueuedJob, result: &mut ProcessResult) -> bool {
        let next_id = {
            let mut queue = self.queue.lock().await;
            queue.re_enqueue(job)
        };

        let Some(next_id) = next_id else {
            warn!(
                queue_id = %job.id,
                attempt = job.attempt,
                background_job_id = ?job.background_job_id(),
                "Max retry attempts reached"
            );
            result.append_message(RETRY_EXHAUSTED_SUFFIX);
            return true;
        };

        if let Some(bg_id) = job.background_job_id() {
            let requeued = self
                .status
                .mark_requeued(bg_id, job.attempt + 1, result.error_text())
                .await;
            if let Err(e) = requeued {
                if self.backing_job_canceled(job).await {
                    let removed = self.queue.lock().await.remove(&next_id);
                    info!(
                        background_job_id = %bg_id,
                        queue_id = %next_id,
                        removed,
                        "Backing job canceled while scheduling retry, retry withdrawn"
                    );
                    return false;
                }
                warn!(
                    background_job_id = %bg_id,
                    queue_id = %next_id,
                    error = %e,
                    "Failed to mark job re-queued"
                );
            }
        }

        result.append_message(RETRY_SCHEDULED_SUFFIX);
        true
    }

    /// Mark the backing job failed; status-write errors are logged and swallowed
    async fn record_failure(&self, job: &QueuedJob, error_message: &str) {
        let Some(bg_id) = job.background_job_id() else {
            warn!(queue_id = %job.id, "Queued job has no backgroundJobId, status not recorded");
            return;
        };

        if let Err(e) = self.status.ensure_failed(bg_id, error_message).await {
            error!(
                background_job_id = %bg_id,
                queue_id = %job.id,
                error = %e,
                "Failed to record job failure"
            );
        }
    }

    async fn backing_job_canceled(&self, job: &QueuedJob) -> bool {
        let Some(bg_id) = job.background_job_id() else {
            return false;
        };
        matches!(
            self.status.find(bg_id).await,
            Ok(found) if found.status == JobStatus::Canceled
        )
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
