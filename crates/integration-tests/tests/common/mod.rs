//! Shared wiring for the scenario tests
#![allow(dead_code)]

use async_trait::async_trait;
use jobrelay_core::application::{
    Dispatcher, JobQueue, JobStatusService, JobSubmissionService, ProcessorRegistry, SharedQueue,
    SubmitRequest, Worker,
};
use jobrelay_core::domain::{JobPayload, JobType, ProcessError, ProcessResult, TokenUsage};
use jobrelay_core::port::id_provider::mocks::SequentialIdProvider;
use jobrelay_core::port::{Processor, StatusRepository, TimeProvider};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the lifecycle processor does on one call
#[derive(Debug, Clone)]
pub enum Attempt {
    Complete(&'static str),
    Fail(&'static str),
}

/// Processor that drives its backing job through preparing and running
/// before completing or failing, like a provider client would
pub struct LifecycleProcessor {
    status: Arc<JobStatusService>,
    script: Mutex<VecDeque<Attempt>>,
    calls: Mutex<usize>,
}

impl LifecycleProcessor {
    pub fn new(status: Arc<JobStatusService>, script: Vec<Attempt>) -> Self {
        Self {
            status,
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Processor for LifecycleProcessor {
    fn name(&self) -> &str {
        "lifecycle"
    }

    async fn process(&self, payload: &JobPayload) -> Result<ProcessResult, ProcessError> {
        *self.calls.lock().unwrap() += 1;
        let job_id = payload
            .background_job_id()
            .ok_or_else(|| ProcessError::permanent("missing backgroundJobId"))?;

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Attempt::Complete("done"));

        self.status
            .mark_preparing(job_id, "Preparing", Some("test-model"), Some(256))
            .await
            .map_err(|e| ProcessError::permanent(e.to_string()))?;
        self.status
            .mark_running(job_id, "Generating")
            .await
            .map_err(|e| ProcessError::permanent(e.to_string()))?;

        match step {
            Attempt::Complete(text) => {
                self.status
                    .mark_completed(job_id, text, TokenUsage::default())
                    .await
                    .map_err(|e| ProcessError::permanent(e.to_string()))?;
                Ok(ProcessResult::success("Generated"))
            }
            Attempt::Fail(message) => Ok(ProcessResult::failure(
                "Generation failed",
                ProcessError::unclassified(message),
            )),
        }
    }
}

pub struct Harness {
    pub queue: SharedQueue,
    pub status: Arc<JobStatusService>,
    pub submission: JobSubmissionService,
    pub worker: Worker,
    pub processor: Arc<LifecycleProcessor>,
}

pub const JOB_TYPE: &str = "text_generation";

/// Wire queue, status service, registry, dispatcher and worker around `repo`
pub fn harness(
    repo: Arc<dyn StatusRepository>,
    clock: Arc<dyn TimeProvider>,
    script: Vec<Attempt>,
) -> Harness {
    let status = Arc::new(JobStatusService::new(repo, clock.clone()));
    let queue = JobQueue::new(Arc::new(SequentialIdProvider::new("q")), clock).into_shared();

    let processor = Arc::new(LifecycleProcessor::new(status.clone(), script));
    let mut registry = ProcessorRegistry::new();
    registry.register(JobType::new(JOB_TYPE), processor.clone());

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        status.clone(),
        queue.clone(),
    ));

    Harness {
        submission: JobSubmissionService::new(status.clone(), queue.clone()),
        worker: Worker::new(dispatcher),
        queue,
        status,
        processor,
    }
}

pub fn request(session_id: &str, job_type: &str, priority: i32) -> SubmitRequest {
    SubmitRequest {
        session_id: session_id.to_string(),
        job_type: job_type.to_string(),
        api_type: "gemini".to_string(),
        task_type: "text_generation".to_string(),
        raw_input: "Write a haiku".to_string(),
        payload: serde_json::json!({ "prompt": "Write a haiku" }),
        priority,
        include_syntax: false,
        temperature: 0.7,
        visible: true,
    }
}

/// Run the scheduling loop body until the queue is empty
pub async fn drain(worker: &Worker) -> Vec<ProcessResult> {
    let mut results = Vec::new();
    while let Some(result) = worker.process_next().await {
        results.push(result);
    }
    results
}
