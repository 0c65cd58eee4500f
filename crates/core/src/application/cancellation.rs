// Cancellation Service
// Queue entries are removed before status is written so a canceled job
// cannot be dequeued in between.

use crate::application::queue::SharedQueue;
use crate::application::status::JobStatusService;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    /// Queue entries dropped
    pub removed_from_queue: usize,
    /// Backing jobs moved to `canceled`
    pub canceled_jobs: usize,
}

pub struct CancellationService {
    status: Arc<JobStatusService>,
    queue: SharedQueue,
}

impl CancellationService {
    pub fn new(status: Arc<JobStatusService>, queue: SharedQueue) -> Self {
        Self { status, queue }
    }

    /// Cancel one background job
    ///
    /// A job that is no longer queued (in flight, or never enqueued) is still
    /// marked canceled. Canceling a terminal job is `InvalidState`.
    pub async fn cancel_job(&self, background_job_id: &str, reason: &str) -> Result<CancelOutcome> {
        if background_job_id.trim().is_empty() {
            return Err(AppError::Validation(
                "backgroundJobId must not be empty".to_string(),
            ));
        }

        let job = self.status.find(background_job_id).await?;
        if job.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Job {} is already {}",
                background_job_id, job.status
            )));
        }

        let removed = self
            .queue
            .lock()
            .await
            .remove_by_background_job_id(background_job_id);

        self.status.mark_canceled(background_job_id, reason).await?;

        info!(
            background_job_id = %background_job_id,
            removed_from_queue = removed,
            "Job canceled"
        );
        Ok(CancelOutcome {
            removed_from_queue: removed,
            canceled_jobs: 1,
        })
    }

    /// Cancel every active job of a session
    pub async fn cancel_session(&self, session_id: &str, reason: &str) -> Result<CancelOutcome> {
        if session_id.trim().is_empty() {
            return Err(AppError::Validation("sessionId must not be empty".to_string()));
        }

        let removed = self.queue.lock().await.remove_by_session_id(session_id);
        let canceled = self.status.cancel_session(session_id, reason).await?;

        info!(
            session_id = %session_id,
            removed_from_queue = removed,
            canceled_jobs = canceled,
            "Session canceled"
        );
        Ok(CancelOutcome {
            removed_from_queue: removed,
            canceled_jobs: canceled,
        })
    }
}
