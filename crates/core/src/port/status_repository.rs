// Status Repository Port (Interface)
// Durable store of Background Job status; the queue itself never persists

use crate::domain::{BackgroundJob, NewBackgroundJob, StatusUpdate};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Background Job persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Create a new job in status `created`
    async fn create(&self, new_job: NewBackgroundJob) -> Result<BackgroundJob>;

    /// Write a status transition (unset fields keep their stored value)
    async fn update_status(&self, update: StatusUpdate) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, job_id: &str) -> Result<Option<BackgroundJob>>;

    /// All jobs of a session, oldest first
    async fn find_by_session_id(&self, session_id: &str) -> Result<Vec<BackgroundJob>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::JobStatus;
    use crate::error::AppError;
    use crate::port::time_provider::{SystemTimeProvider, TimeProvider};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory Status Repository with failure injection
    pub struct InMemoryStatusRepository {
        jobs: Mutex<Vec<BackgroundJob>>,
        history: Mutex<HashMap<String, Vec<JobStatus>>>,
        unavailable: AtomicBool,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl Default for InMemoryStatusRepository {
        fn default() -> Self {
            Self::new(Arc::new(SystemTimeProvider))
        }
    }

    impl InMemoryStatusRepository {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                jobs: Mutex::new(Vec::new()),
                history: Mutex::new(HashMap::new()),
                unavailable: AtomicBool::new(false),
                time_provider,
            }
        }

        /// Make every call fail with a database error
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Every status the job has been written with, in order
        pub fn history(&self, job_id: &str) -> Vec<JobStatus> {
            self.history
                .lock()
                .unwrap()
                .get(job_id)
                .cloned()
                .unwrap_or_default()
        }

        pub fn get(&self, job_id: &str) -> Option<BackgroundJob> {
            self.jobs
                .lock()
                .unwrap()
                .iter()
                .find(|j| j.id == job_id)
                .cloned()
        }

        fn check_available(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::Database("status repository unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StatusRepository for InMemoryStatusRepository {
        async fn create(&self, new_job: NewBackgroundJob) -> Result<BackgroundJob> {
            self.check_available()?;
            let job = BackgroundJob::from_new(
                uuid::Uuid::new_v4().to_string(),
                self.time_provider.now_millis(),
                new_job,
            );
            self.history
                .lock()
                .unwrap()
                .insert(job.id.clone(), vec![JobStatus::Created]);
            self.jobs.lock().unwrap().push(job.clone());
            Ok(job)
        }

        async fn update_status(&self, update: StatusUpdate) -> Result<()> {
            self.check_available()?;
            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs
                .iter_mut()
                .find(|j| j.id == update.job_id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", update.job_id)))?;
            job.apply(&update);
            self.history
                .lock()
                .unwrap()
                .entry(update.job_id.clone())
                .or_default()
                .push(update.status);
            Ok(())
        }

        async fn find_by_id(&self, job_id: &str) -> Result<Option<BackgroundJob>> {
            self.check_available()?;
            Ok(self.get(job_id))
        }

        async fn find_by_session_id(&self, session_id: &str) -> Result<Vec<BackgroundJob>> {
            self.check_available()?;
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .iter()
                .filter(|j| j.session_id == session_id)
                .cloned()
                .collect())
        }
    }
}
