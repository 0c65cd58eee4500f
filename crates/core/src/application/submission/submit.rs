// Submit Use Case

use crate::application::queue::SharedQueue;
use crate::application::status::JobStatusService;
use crate::domain::{
    BackgroundJobId, JobPayload, JobSpec, JobType, NewBackgroundJob, Priority, QueueJobId,
    MIN_PRIORITY,
};
use crate::error::{AppError, Result};
use crate::port::StatusRepository;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub const MAX_PRIORITY: Priority = 100;
pub const DEFAULT_PRIORITY: Priority = 5;
pub const MAX_JOB_TYPE_LEN: usize = 64;
pub const MAX_SESSION_ID_LEN: usize = 128;
pub const MAX_PAYLOAD_DEPTH: usize = 32;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Submission request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub session_id: String,
    pub job_type: String,
    pub api_type: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub raw_input: String,

    /// Task data handed to the processor
    #[serde(default)]
    pub payload: Value,

    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub include_syntax: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_priority() -> Priority {
    DEFAULT_PRIORITY
}

fn default_temperature() -> f64 {
    0.7
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub background_job_id: BackgroundJobId,
    pub queue_job_id: QueueJobId,
}

/// Reject malformed requests before anything is written
pub fn validate_request(req: &SubmitRequest) -> Result<()> {
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation("sessionId must not be empty".to_string()));
    }
    if req.session_id.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::Validation(format!(
            "sessionId too long (max {} chars)",
            MAX_SESSION_ID_LEN
        )));
    }

    if req.job_type.is_empty() {
        return Err(AppError::Validation("jobType must not be empty".to_string()));
    }
    if req.job_type.len() > MAX_JOB_TYPE_LEN {
        return Err(AppError::Validation(format!(
            "jobType too long (max {} chars)",
            MAX_JOB_TYPE_LEN
        )));
    }
    if !req
        .job_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::Validation(
            "jobType must be alphanumeric (plus '_', '-', '.')".to_string(),
        ));
    }

    if req.api_type.trim().is_empty() {
        return Err(AppError::Validation("apiType must not be empty".to_string()));
    }

    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&req.priority) {
        return Err(AppError::Validation(format!(
            "priority {} out of range ({}..={})",
            req.priority, MIN_PRIORITY, MAX_PRIORITY
        )));
    }

    if !(0.0..=MAX_TEMPERATURE).contains(&req.temperature) {
        return Err(AppError::Validation(format!(
            "temperature {} out of range (0..={})",
            req.temperature, MAX_TEMPERATURE
        )));
    }

    if json_depth(&req.payload) > MAX_PAYLOAD_DEPTH {
        return Err(AppError::Validation(format!(
            "payload too deeply nested (max depth {})",
            MAX_PAYLOAD_DEPTH
        )));
    }

    Ok(())
}

fn json_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(json_depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Execute submit use case
///
/// created -> enqueue -> queued. A failed `queued` write is logged; the
/// entry stays in the queue and dispatch proceeds from `created`.
pub async fn execute(
    status: &JobStatusService,
    queue: &SharedQueue,
    req: SubmitRequest,
) -> Result<SubmitResponse> {
    validate_request(&req)?;

    let job = status
        .repository()
        .create(NewBackgroundJob {
            session_id: req.session_id.clone(),
            api_type: req.api_type,
            task_type: req.task_type,
            raw_input: req.raw_input,
            include_syntax: req.include_syntax,
            temperature: req.temperature,
            visible: req.visible,
        })
        .await?;

    let payload = JobPayload::for_job(job.id.clone(), req.session_id, req.payload);
    let queue_job_id = {
        let mut queue = queue.lock().await;
        queue.enqueue(JobSpec::new(JobType::new(req.job_type), payload, req.priority))
    };

    if let Err(e) = status.mark_queued(&job.id, 1).await {
        warn!(background_job_id = %job.id, error = %e, "Failed to mark job queued");
    }

    info!(
        background_job_id = %job.id,
        queue_id = %queue_job_id,
        "Job submitted"
    );

    Ok(SubmitResponse {
        background_job_id: job.id,
        queue_job_id,
    })
}
