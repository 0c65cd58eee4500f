// Background Job - the persisted entity behind a queued job

use super::job::{BackgroundJobId, SessionId};
use super::status::JobStatus;
use serde::{Deserialize, Serialize};

/// Durable status record owned by the Status Repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundJob {
    pub id: BackgroundJobId,
    pub session_id: SessionId,
    pub api_type: String,
    pub task_type: String,
    pub raw_input: String,
    pub include_syntax: bool,
    pub temperature: f64,
    pub visible: bool,

    pub status: JobStatus,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    pub response: Option<String>,
    pub metadata: Option<serde_json::Value>,

    pub tokens_sent: Option<i64>,
    pub tokens_received: Option<i64>,
    pub total_tokens: Option<i64>,

    pub created_at: i64, // epoch ms
    /// UI freshness marker only
    pub updated_at: i64,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

/// Arguments to `StatusRepository::create`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBackgroundJob {
    pub session_id: SessionId,
    pub api_type: String,
    pub task_type: String,
    pub raw_input: String,
    #[serde(default)]
    pub include_syntax: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_visible() -> bool {
    true
}

impl BackgroundJob {
    /// Materialize a freshly created job (status `created`)
    pub fn from_new(id: impl Into<String>, now_millis: i64, new: NewBackgroundJob) -> Self {
        Self {
            id: id.into(),
            session_id: new.session_id,
            api_type: new.api_type,
            task_type: new.task_type,
            raw_input: new.raw_input,
            include_syntax: new.include_syntax,
            temperature: new.temperature,
            visible: new.visible,
            status: JobStatus::Created,
            status_message: None,
            error_message: None,
            response: None,
            metadata: None,
            tokens_sent: None,
            tokens_received: None,
            total_tokens: None,
            created_at: now_millis,
            updated_at: now_millis,
            start_time: None,
            end_time: None,
        }
    }

    /// Apply a status update in place (None fields keep their value)
    pub fn apply(&mut self, update: &StatusUpdate) {
        self.status = update.status;
        self.updated_at = update.updated_at;
        if let Some(start) = update.start_time {
            self.start_time = Some(start);
        }
        if update.clear_end_time {
            self.end_time = None;
        } else if let Some(end) = update.end_time {
            self.end_time = Some(end);
        }
        if let Some(response) = &update.response {
            self.response = Some(response.clone());
        }
        if let Some(msg) = &update.status_message {
            self.status_message = Some(msg.clone());
        }
        if let Some(err) = &update.error_message {
            self.error_message = Some(err.clone());
        }
        if let Some(meta) = &update.metadata {
            self.metadata = Some(merge_metadata(self.metadata.take(), meta.clone()));
        }
        if let Some(usage) = &update.usage {
            self.tokens_sent = usage.tokens_sent.or(self.tokens_sent);
            self.tokens_received = usage.tokens_received.or(self.tokens_received);
            self.total_tokens = usage.total_tokens.or(self.total_tokens);
        }
    }
}

/// Merge `patch` into `base` (top-level object keys overwrite)
pub fn merge_metadata(
    base: Option<serde_json::Value>,
    patch: serde_json::Value,
) -> serde_json::Value {
    match (base, patch) {
        (Some(serde_json::Value::Object(mut base)), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key, value);
            }
            serde_json::Value::Object(base)
        }
        (_, patch) => patch,
    }
}

/// Token usage reported on completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub tokens_sent: Option<i64>,
    pub tokens_received: Option<i64>,
    pub total_tokens: Option<i64>,
}

/// Arguments to `StatusRepository::update_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub job_id: BackgroundJobId,
    pub status: JobStatus,
    pub updated_at: i64,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Reset `end_time` to unset; takes precedence over `end_time`
    #[serde(default)]
    pub clear_end_time: bool,
    pub response: Option<String>,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub usage: Option<TokenUsage>,
}

impl StatusUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus, updated_at: i64) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            updated_at,
            start_time: None,
            end_time: None,
            clear_end_time: false,
            response: None,
            status_message: None,
            error_message: None,
            metadata: None,
            usage: None,
        }
    }
}
