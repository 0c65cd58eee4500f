// Job Submission Service - entry point for new work

pub mod submit;


pub use submit::{validate_request, SubmitRequest, SubmitResponse};

use crate::application::queue::SharedQueue;
use crate::application::status::JobStatusService;
use crate::error::Result;
use std::sync::Arc;

pub struct JobSubmissionService {
    status: Arc<JobStatusService>,
    queue: SharedQueue,
}

impl JobSubmissionService {
    pub fn new(status: Arc<JobStatusService>, queue: SharedQueue) -> Self {
        Self { status, queue }
    }

    /// Create the backing job and enqueue its first attempt
    pub async fn submit(&self, req: SubmitRequest) -> Result<SubmitResponse> {
        submit::execute(&self.status, &self.queue, req).await
    }
}
