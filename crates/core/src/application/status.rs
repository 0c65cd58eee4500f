//! Status state machine helpers
//!
//! One operation per edge of the Background Job lifecycle. Every helper
//! rejects an empty job id before touching the repository, refuses illegal
//! transitions, and stamps `updated_at`.

use crate::domain::{
    BackgroundJob, DomainError, JobStatus, StatusUpdate, TokenUsage, MAX_ATTEMPTS,
};
use crate::error::{AppError, Result};
use crate::port::{StatusRepository, TimeProvider};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest error text stored on a job (characters)
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Message substring a processor uses to say it already wrote terminal status
pub const STATUS_RECORDED_MARKER: &str = "status already updated";

/// Default message for cancellation sweeps
pub const DEFAULT_CANCEL_REASON: &str = "Canceled by user";

pub struct JobStatusService {
    repo: Arc<dyn StatusRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobStatusService {
    pub fn new(repo: Arc<dyn StatusRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            repo,
            time_provider,
        }
    }

    pub fn repository(&self) -> &Arc<dyn StatusRepository> {
        &self.repo
    }

    /// created -> queued
    pub async fn mark_queued(&self, job_id: &str, attempt: u32) -> Result<()> {
        let job = self.load(job_id).await?;
        check_transition(&job, JobStatus::Queued)?;

        let mut update = self.update(job_id, JobStatus::Queued);
        update.status_message = Some(format!("Queued (attempt {}/{})", attempt, MAX_ATTEMPTS));
        self.repo.update_status(update).await
    }

    /// -> preparing, recording setup metadata
    pub async fn mark_preparing(
        &self,
        job_id: &str,
        message: &str,
        model: Option<&str>,
        max_output_tokens: Option<u32>,
    ) -> Result<()> {
        let job = self.load(job_id).await?;
        check_transition(&job, JobStatus::Preparing)?;

        let mut update = self.update(job_id, JobStatus::Preparing);
        update.status_message = Some(message.to_string());
        update.metadata = Some(json!({
            "model": model,
            "maxOutputTokens": max_output_tokens,
        }));
        self.repo.update_status(update).await
    }

    /// preparing -> running
    pub async fn mark_running(&self, job_id: &str, message: &str) -> Result<()> {
        let job = self.load(job_id).await?;
        check_transition(&job, JobStatus::Running)?;

        let mut update = self.update(job_id, JobStatus::Running);
        update.start_time = Some(update.updated_at);
        update.status_message = Some(message.to_string());
        self.repo.update_status(update).await
    }

    /// running -> completed
    pub async fn mark_completed(
        &self,
        job_id: &str,
        response: &str,
        usage: TokenUsage,
    ) -> Result<()> {
        let job = self.load(job_id).await?;
        check_transition(&job, JobStatus::Completed)?;

        let mut update = self.update(job_id, JobStatus::Completed);
        update.end_time = Some(update.updated_at);
        update.response = Some(response.to_string());
        update.status_message = Some("Completed".to_string());
        update.usage = Some(usage);
        info!(job_id = %job_id, "Job completed");
        self.repo.update_status(update).await
    }

    /// -> failed
    pub async fn mark_failed(&self, job_id: &str, error_message: &str) -> Result<()> {
        let job = self.load(job_id).await?;
        check_transition(&job, JobStatus::Failed)?;
        self.write_failed(job_id, error_message).await
    }

    /// Mark failed unless the job is already terminal.
    /// Returns whether a write happened.
    pub async fn ensure_failed(&self, job_id: &str, error_message: &str) -> Result<bool> {
        let job = self.load(job_id).await?;
        if job.status.is_terminal() {
            debug!(
                job_id = %job_id,
                status = %job.status,
                "Job already terminal, not marking failed"
            );
            return Ok(false);
        }
        self.write_failed(job_id, error_message).await?;
        Ok(true)
    }

    /// failed -> queued, only for a scheduled retry
    ///
    /// `attempt` is the attempt about to run. Retry history (`retryCount`,
    /// `lastError`, `lastRetryAt`) is merged into the job's metadata and the
    /// previous attempt's end time is cleared.
    pub async fn mark_requeued(
        &self,
        job_id: &str,
        attempt: u32,
        last_error: &str,
    ) -> Result<()> {
        let job = self.load(job_id).await?;
        if job.status != JobStatus::Failed {
            return Err(DomainError::InvalidStateTransition {
                from: job.status.to_string(),
                to: JobStatus::Queued.to_string(),
            }
            .into());
        }

        let mut update = self.update(job_id, JobStatus::Queued);
        update.clear_end_time = true;
        update.status_message = Some(format!(
            "Re-enqueued for retry (attempt {}/{})",
            attempt, MAX_ATTEMPTS
        ));
        update.metadata = Some(json!({
            "retryCount": attempt.saturating_sub(1),
            "lastError": summarize_error(last_error),
            "lastRetryAt": update.updated_at,
        }));
        self.repo.update_status(update).await
    }

    /// -> canceled; partial response is left in place
    pub async fn mark_canceled(&self, job_id: &str, reason: &str) -> Result<()> {
        let job = self.load(job_id).await?;
        check_transition(&job, JobStatus::Canceled)?;
        self.write_canceled(&job, reason).await
    }

    /// Cancel every active job of a session, returning how many were canceled
    pub async fn cancel_session(&self, session_id: &str, reason: &str) -> Result<usize> {
        if session_id.trim().is_empty() {
            return Err(AppError::Validation("session id must not be empty".to_string()));
        }

        let jobs = self.repo.find_by_session_id(session_id).await?;
        let mut canceled = 0;
        for job in jobs.iter().filter(|j| j.status.is_active()) {
            match self.write_canceled(job, reason).await {
                Ok(()) => canceled += 1,
                Err(e) => warn!(
                    job_id = %job.id,
                    session_id = %session_id,
                    error = %e,
                    "Failed to cancel job during session sweep"
                ),
            }
        }

        info!(session_id = %session_id, canceled, "Session cancellation sweep finished");
        Ok(canceled)
    }

    pub async fn find(&self, job_id: &str) -> Result<BackgroundJob> {
        self.load(job_id).await
    }

    async fn write_failed(&self, job_id: &str, error_message: &str) -> Result<()> {
        let mut update = self.update(job_id, JobStatus::Failed);
        update.end_time = Some(update.updated_at);
        update.error_message = Some(summarize_error(error_message));
        update.status_message = Some("Failed".to_string());
        warn!(job_id = %job_id, error = %error_message, "Job failed");
        self.repo.update_status(update).await
    }

    async fn write_canceled(&self, job: &BackgroundJob, reason: &str) -> Result<()> {
        let mut update = self.update(&job.id, JobStatus::Canceled);
        update.end_time = Some(update.updated_at);
        update.status_message = Some(reason.to_string());
        info!(
            job_id = %job.id,
            had_partial_response = job.response.is_some(),
            "Job canceled"
        );
        self.repo.update_status(update).await
    }

    async fn load(&self, job_id: &str) -> Result<BackgroundJob> {
        require_id(job_id)?;
        self.repo
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| DomainError::JobNotFound(job_id.to_string()).into())
    }

    fn update(&self, job_id: &str, status: JobStatus) -> StatusUpdate {
        StatusUpdate::new(job_id, status, self.time_provider.now_millis())
    }
}

fn require_id(job_id: &str) -> Result<()> {
    if job_id.trim().is_empty() {
        return Err(AppError::Validation("job id must not be empty".to_string()));
    }
    Ok(())
}

fn check_transition(job: &BackgroundJob, next: JobStatus) -> Result<()> {
    if !job.status.can_transition_to(next) {
        return Err(DomainError::InvalidStateTransition {
            from: job.status.to_string(),
            to: next.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Trim and cap error text for display
pub fn summarize_error(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    format!("{}...", cut)
}
