//! Built-in processors

use async_trait::async_trait;
use jobrelay_core::application::JobStatusService;
use jobrelay_core::domain::{JobPayload, ProcessError, ProcessResult, TokenUsage};
use jobrelay_core::error::AppError;
use jobrelay_core::port::Processor;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const ECHO_JOB_TYPE: &str = "echo";

/// Walks a job through preparing -> running -> completed, responding with
/// the payload's `input`.
///
/// Optional payload keys: `delayMs` (simulated work), `failWith` (return an
/// untyped failure with that message).
pub struct EchoProcessor {
    status: Arc<JobStatusService>,
}

impl EchoProcessor {
    pub fn new(status: Arc<JobStatusService>) -> Self {
        Self { status }
    }
}

#[async_trait]
impl Processor for EchoProcessor {
    fn name(&self) -> &str {
        "echo"
    }

    async fn process(&self, payload: &JobPayload) -> Result<ProcessResult, ProcessError> {
        let job_id = payload
            .background_job_id()
            .ok_or_else(|| ProcessError::permanent("Missing backgroundJobId in payload"))?;

        self.status
            .mark_preparing(job_id, "Preparing echo", None, None)
            .await
            .map_err(status_error)?;

        if let Some(message) = payload.str_field("failWith") {
            return Ok(ProcessResult::failure(
                "Echo failed",
                ProcessError::unclassified(message),
            ));
        }

        self.status
            .mark_running(job_id, "Echoing input")
            .await
            .map_err(status_error)?;

        if let Some(delay) = payload.as_value().get("delayMs").and_then(|v| v.as_u64()) {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let input = payload.str_field("input").unwrap_or_default().to_string();
        let words = input.split_whitespace().count() as i64;
        self.status
            .mark_completed(
                job_id,
                &input,
                TokenUsage {
                    tokens_sent: Some(words),
                    tokens_received: Some(words),
                    total_tokens: Some(words * 2),
                },
            )
            .await
            .map_err(status_error)?;

        debug!(job_id = %job_id, "Echo completed");
        Ok(ProcessResult::success("Echo completed").with_data(json!({ "response": input })))
    }
}

/// Database trouble is worth retrying; anything else is not
fn status_error(err: AppError) -> ProcessError {
    match err {
        AppError::Database(msg) => ProcessError::transient(msg),
        other => ProcessError::permanent(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobrelay_core::domain::{JobStatus, NewBackgroundJob};
    use jobrelay_core::port::status_repository::mocks::InMemoryStatusRepository;
    use jobrelay_core::port::time_provider::mocks::ManualTimeProvider;
    use jobrelay_core::port::{StatusRepository, TimeProvider};

    async fn setup() -> (Arc<InMemoryStatusRepository>, EchoProcessor, String) {
        let clock: Arc<dyn TimeProvider> = Arc::new(ManualTimeProvider::new(0));
        let repo = Arc::new(InMemoryStatusRepository::new(clock.clone()));
        let status = Arc::new(JobStatusService::new(repo.clone(), clock));
        let job = repo
            .create(NewBackgroundJob {
                session_id: "s".to_string(),
                api_type: "local".to_string(),
                task_type: "echo".to_string(),
                raw_input: "hello there".to_string(),
                include_syntax: false,
                temperature: 0.7,
                visible: true,
            })
            .await
            .unwrap();
        (repo, EchoProcessor::new(status), job.id)
    }

    #[tokio::test]
    async fn test_echo_completes_job() {
        let (repo, processor, job_id) = setup().await;
        let payload = JobPayload::for_job(job_id.clone(), "s", json!({"input": "hello there"}));

        let result = processor.process(&payload).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["response"], "hello there");

        let job = repo.get(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.response.as_deref(), Some("hello there"));
        assert_eq!(job.total_tokens, Some(4));
        assert_eq!(
            repo.history(&job_id),
            vec![
                JobStatus::Created,
                JobStatus::Preparing,
                JobStatus::Running,
                JobStatus::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_background_job_id() {
        let (_, processor, _) = setup().await;
        let err = processor
            .process(&JobPayload::new(json!({"input": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, jobrelay_core::domain::ErrorKind::Permanent);
    }

    #[tokio::test]
    async fn test_fail_with() {
        let (_, processor, job_id) = setup().await;
        let payload = JobPayload::for_job(job_id, "s", json!({"failWith": "network blip"}));
        let result = processor.process(&payload).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_text(), "network blip");
    }
}
