// Application Layer - Use Cases and Business Logic

pub mod cancellation;
pub mod dispatcher;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod status;
pub mod submission;
pub mod worker;

// Re-exports
pub use cancellation::{CancelOutcome, CancellationService};
pub use dispatcher::Dispatcher;
pub use queue::{JobQueue, QueueStats, SharedQueue};
pub use registry::ProcessorRegistry;
pub use retry::{classify, RetryDecision, RetryReason};
pub use status::JobStatusService;
pub use submission::{JobSubmissionService, SubmitRequest, SubmitResponse};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
