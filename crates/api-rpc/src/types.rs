//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use jobrelay_core::domain::BackgroundJob;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// jobs.submit.v1 - Create a background job and enqueue it
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub session_id: String,
    pub job_type: String,
    pub api_type: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub raw_input: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub priority: Option<i32>,
    #[serde(default)]
    pub include_syntax: bool,
    pub temperature: Option<f64>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitJobResponse {
    pub background_job_id: String,
    pub queue_job_id: String,
    pub status: String,
}

/// jobs.cancel.v1 - Cancel one background job
#[derive(Debug, Deserialize)]
pub struct CancelJobRequest {
    pub background_job_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelJobResponse {
    pub background_job_id: String,
    pub removed_from_queue: usize,
    pub canceled: bool,
}

/// sessions.cancel.v1 - Cancel all active jobs of a session
#[derive(Debug, Deserialize)]
pub struct CancelSessionRequest {
    pub session_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelSessionResponse {
    pub session_id: String,
    pub removed_from_queue: usize,
    pub canceled_jobs: usize,
}

/// sessions.jobs.v1 - List background jobs of a session
#[derive(Debug, Deserialize)]
pub struct SessionJobsRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionJobsResponse {
    pub session_id: String,
    pub jobs: Vec<BackgroundJob>,
}

/// queue.stats.v1 - Queue snapshot (no parameters)
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatsResponse {
    pub total: usize,
    pub by_priority: BTreeMap<i32, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub total_retries: u64,
    pub registered_job_types: Vec<String>,
    pub uptime_seconds: u64,
}
