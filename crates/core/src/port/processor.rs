// Processor Port
// Implemented by provider clients (text generation, transcription, ...)

use crate::domain::{JobPayload, ProcessError, ProcessResult};
use async_trait::async_trait;

/// Executable unit for one job type
///
/// Returning `Ok` with `success == false` is a handled failure; returning
/// `Err` (or panicking) is treated as an unhandled exception by the
/// dispatcher. Both are classified the same way for retry purposes.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    async fn process(&self, payload: &JobPayload) -> Result<ProcessResult, ProcessError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// One scripted call outcome
    #[derive(Debug, Clone)]
    pub enum MockStep {
        /// Return a successful result
        Succeed(String),
        /// Return `Ok` with a failed result
        Fail(ProcessResult),
        /// Return `Err`
        Raise(ProcessError),
        /// Panic with message (for isolation testing)
        Panic(String),
        /// Sleep, then succeed
        Sleep(Duration),
    }

    /// Processor that plays back a script, one step per call.
    /// The last step repeats once the script runs out.
    pub struct ScriptedProcessor {
        name: String,
        steps: Arc<Mutex<VecDeque<MockStep>>>,
        last: Arc<Mutex<Option<MockStep>>>,
        calls: Arc<Mutex<Vec<JobPayload>>>,
    }

    impl ScriptedProcessor {
        pub fn new(name: impl Into<String>, steps: Vec<MockStep>) -> Self {
            Self {
                name: name.into(),
                steps: Arc::new(Mutex::new(steps.into())),
                last: Arc::new(Mutex::new(None)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn always_succeed(name: impl Into<String>) -> Self {
            Self::new(name, vec![MockStep::Succeed("ok".to_string())])
        }

        /// Handled failure carrying an `Unclassified` error with `error_message`
        pub fn always_fail(name: impl Into<String>, error_message: impl Into<String>) -> Self {
            let message = error_message.into();
            Self::new(
                name,
                vec![MockStep::Fail(ProcessResult::failure(
                    "Processing failed",
                    ProcessError::unclassified(message),
                ))],
            )
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn payloads(&self) -> Vec<JobPayload> {
            self.calls.lock().unwrap().clone()
        }

        fn next_step(&self) -> Option<MockStep> {
            let mut steps = self.steps.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(step) = steps.pop_front() {
                *last = Some(step.clone());
                Some(step)
            } else {
                last.clone()
            }
        }
    }

    #[async_trait]
    impl Processor for ScriptedProcessor {
        fn name(&self) -> &str {
            &self.name
        }

        async fn process(&self, payload: &JobPayload) -> Result<ProcessResult, ProcessError> {
            self.calls.lock().unwrap().push(payload.clone());

            match self.next_step() {
                Some(MockStep::Succeed(msg)) => Ok(ProcessResult::success(msg)),
                Some(MockStep::Fail(result)) => Ok(result),
                Some(MockStep::Raise(err)) => Err(err),
                Some(MockStep::Panic(msg)) => {
                    panic!("{}", msg); // Actually panic for isolation testing
                }
                Some(MockStep::Sleep(duration)) => {
                    tokio::time::sleep(duration).await;
                    Ok(ProcessResult::success("slept"))
                }
                None => Ok(ProcessResult::success("ok")),
            }
        }
    }
}
