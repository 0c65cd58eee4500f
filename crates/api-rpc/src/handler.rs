//! RPC Method Handlers

use crate::error::to_rpc_error;
use crate::types::{
    CancelJobRequest, CancelJobResponse, CancelSessionRequest, CancelSessionResponse,
    QueueStatsResponse, SessionJobsRequest, SessionJobsResponse, SubmitJobRequest,
    SubmitJobResponse,
};
use jobrelay_core::application::status::DEFAULT_CANCEL_REASON;
use jobrelay_core::application::submission::submit::DEFAULT_PRIORITY;
use jobrelay_core::application::{
    CancellationService, JobSubmissionService, ProcessorRegistry, SharedQueue, SubmitRequest,
};
use jobrelay_core::domain::JobStatus;
use jobrelay_core::error::AppError;
use jobrelay_core::port::StatusRepository;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    submission: Arc<JobSubmissionService>,
    cancellation: Arc<CancellationService>,
    status_repo: Arc<dyn StatusRepository>,
    registry: Arc<ProcessorRegistry>,
    queue: SharedQueue,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        submission: Arc<JobSubmissionService>,
        cancellation: Arc<CancellationService>,
        status_repo: Arc<dyn StatusRepository>,
        registry: Arc<ProcessorRegistry>,
        queue: SharedQueue,
    ) -> Self {
        Self {
            submission,
            cancellation,
            status_repo,
            registry,
            queue,
            start_time: Instant::now(),
        }
    }

    /// jobs.submit.v1
    pub async fn submit(
        &self,
        params: SubmitJobRequest,
    ) -> Result<SubmitJobResponse, ErrorObjectOwned> {
        let req = SubmitRequest {
            session_id: params.session_id,
            job_type: params.job_type,
            api_type: params.api_type,
            task_type: params.task_type,
            raw_input: params.raw_input,
            payload: params.payload,
            priority: params.priority.unwrap_or(DEFAULT_PRIORITY),
            include_syntax: params.include_syntax,
            temperature: params.temperature.unwrap_or(0.7),
            visible: params.visible.unwrap_or(true),
        };

        let resp = self.submission.submit(req).await.map_err(to_rpc_error)?;

        Ok(SubmitJobResponse {
            background_job_id: resp.background_job_id,
            queue_job_id: resp.queue_job_id,
            status: JobStatus::Queued.to_string(),
        })
    }

    /// jobs.cancel.v1
    pub async fn cancel_job(
        &self,
        params: CancelJobRequest,
    ) -> Result<CancelJobResponse, ErrorObjectOwned> {
        let reason = params.reason.as_deref().unwrap_or(DEFAULT_CANCEL_REASON);
        let outcome = self
            .cancellation
            .cancel_job(&params.background_job_id, reason)
            .await
            .map_err(to_rpc_error)?;

        Ok(CancelJobResponse {
            background_job_id: params.background_job_id,
            removed_from_queue: outcome.removed_from_queue,
            canceled: outcome.canceled_jobs > 0,
        })
    }

    /// sessions.cancel.v1
    pub async fn cancel_session(
        &self,
        params: CancelSessionRequest,
    ) -> Result<CancelSessionResponse, ErrorObjectOwned> {
        let reason = params.reason.as_deref().unwrap_or(DEFAULT_CANCEL_REASON);
        let outcome = self
            .cancellation
            .cancel_session(&params.session_id, reason)
            .await
            .map_err(to_rpc_error)?;

        Ok(CancelSessionResponse {
            session_id: params.session_id,
            removed_from_queue: outcome.removed_from_queue,
            canceled_jobs: outcome.canceled_jobs,
        })
    }

    /// sessions.jobs.v1
    pub async fn session_jobs(
        &self,
        params: SessionJobsRequest,
    ) -> Result<SessionJobsResponse, ErrorObjectOwned> {
        if params.session_id.trim().is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "session_id must not be empty".to_string(),
            )));
        }

        let jobs = self
            .status_repo
            .find_by_session_id(&params.session_id)
            .await
            .map_err(to_rpc_error)?;
        debug!(session_id = %params.session_id, count = jobs.len(), "Listed session jobs");

        Ok(SessionJobsResponse {
            session_id: params.session_id,
            jobs,
        })
    }

    /// queue.stats.v1
    pub async fn queue_stats(&self) -> Result<QueueStatsResponse, ErrorObjectOwned> {
        let stats = self.queue.lock().await.stats();

        Ok(QueueStatsResponse {
            total: stats.total,
            by_priority: stats.by_priority,
            by_type: stats.by_type,
            total_retries: stats.total_retries,
            registered_job_types: self
                .registry
                .registered_job_types()
                .into_iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }
}
