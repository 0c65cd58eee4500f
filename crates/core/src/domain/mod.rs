// Domain Layer - Pure business logic and entities

pub mod background_job;
pub mod error;
pub mod job;
pub mod outcome;
pub mod status;

// Re-exports
pub use background_job::{BackgroundJob, NewBackgroundJob, StatusUpdate, TokenUsage};
pub use error::DomainError;
pub use job::{
    BackgroundJobId, JobPayload, JobSpec, JobType, Priority, QueueJobId, QueuedJob, SessionId,
    MAX_ATTEMPTS, MIN_PRIORITY,
};
pub use outcome::{ErrorKind, ProcessError, ProcessResult};
pub use status::JobStatus;
