// Queued Job Domain Model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Queue-local job ID (UUID v4), distinct from the backing job's identity
pub type QueueJobId = String;

/// Persistent identity of a Background Job
pub type BackgroundJobId = String;

/// Session identifier
pub type SessionId = String;

/// Priority (higher number = served first)
pub type Priority = i32;

/// Maximum number of attempts for one logical job (including the first)
pub const MAX_ATTEMPTS: u32 = 3;

/// Retry priority floor
pub const MIN_PRIORITY: Priority = 1;

/// Payload key carrying the persistent job identity
pub const BACKGROUND_JOB_ID_KEY: &str = "backgroundJobId";

/// Payload key carrying the session identity
pub const SESSION_ID_KEY: &str = "sessionId";

/// Job Type - tag selecting which Processor handles the work
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobType(String);

impl JobType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job Payload (JSON object)
///
/// Always carries `backgroundJobId` and `sessionId`; everything else is
/// job-type-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPayload(Value);

impl JobPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a payload from the two required identities plus task data.
    ///
    /// Non-object `data` is stored under a `data` key.
    pub fn for_job(
        background_job_id: impl Into<String>,
        session_id: impl Into<String>,
        data: Value,
    ) -> Self {
        let mut map = match data {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert(
            BACKGROUND_JOB_ID_KEY.to_string(),
            Value::String(background_job_id.into()),
        );
        map.insert(SESSION_ID_KEY.to_string(), Value::String(session_id.into()));
        Self(Value::Object(map))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn background_job_id(&self) -> Option<&str> {
        self.str_field(BACKGROUND_JOB_ID_KEY)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.str_field(SESSION_ID_KEY)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Enqueue contract: what a caller hands to `JobQueue::enqueue`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_type: JobType,
    pub payload: JobPayload,
    pub priority: Priority,
}

impl JobSpec {
    pub fn new(job_type: JobType, payload: JobPayload, priority: Priority) -> Self {
        Self {
            job_type,
            payload,
            priority,
        }
    }
}

/// A unit of pending work held by the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: QueueJobId,
    pub job_type: JobType,
    pub payload: JobPayload,
    pub priority: Priority,
    pub created_at: i64, // epoch ms
    /// 1-based, includes the current attempt
    pub attempt: u32,
}

impl QueuedJob {
    pub fn background_job_id(&self) -> Option<&str> {
        self.payload.background_job_id()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.payload.session_id()
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempt < MAX_ATTEMPTS
    }

    /// Priority the next attempt is enqueued with
    pub fn retry_priority(&self) -> Priority {
        self.priority.saturating_sub(1).max(MIN_PRIORITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(priority: Priority, attempt: u32) -> QueuedJob {
        QueuedJob {
            id: "q-1".to_string(),
            job_type: JobType::new("text_generation"),
            payload: JobPayload::for_job("bg-1", "session-1", json!({"prompt": "hi"})),
            priority,
            created_at: 1000,
            attempt,
        }
    }

    #[test]
    fn test_payload_identities() {
        let payload = JobPayload::for_job("bg-1", "session-1", json!({"prompt": "hi"}));
        assert_eq!(payload.background_job_id(), Some("bg-1"));
        assert_eq!(payload.session_id(), Some("session-1"));
        assert_eq!(payload.str_field("prompt"), Some("hi"));
    }

    #[test]
    fn test_payload_wraps_scalar_data() {
        let payload = JobPayload::for_job("bg-1", "s", json!("raw text"));
        assert_eq!(payload.str_field("data"), Some("raw text"));
        assert_eq!(payload.background_job_id(), Some("bg-1"));
    }

    #[test]
    fn test_payload_missing_identity() {
        let payload = JobPayload::new(json!({"sessionId": "s"}));
        assert!(payload.background_job_id().is_none());
    }

    #[test]
    fn test_retry_priority_floor() {
        assert_eq!(job(5, 1).retry_priority(), 4);
        assert_eq!(job(1, 1).retry_priority(), 1);
        assert_eq!(job(-3, 1).retry_priority(), MIN_PRIORITY);
        assert_eq!(job(i32::MIN, 1).retry_priority(), MIN_PRIORITY);
    }

    #[test]
    fn test_attempt_budget() {
        assert!(job(5, 1).has_attempts_left());
        assert!(job(5, 2).has_attempts_left());
        assert!(!job(5, MAX_ATTEMPTS).has_attempts_left());
    }
}
