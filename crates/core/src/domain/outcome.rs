// Processor outcome types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What kind of failure a processor hit
///
/// Processors that know what went wrong say so; `Unclassified` errors are
/// classified from their message at the dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No processor / bad wiring. Never retried.
    Configuration,
    /// Network, timeout, rate limit, 5xx
    Transient,
    /// Auth, validation and similar. Never retried.
    Permanent,
    /// Untyped failure from an external call
    Unclassified,
}

/// Error returned (or raised) by a processor
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProcessError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProcessError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permanent, message)
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unclassified, message)
    }
}

impl From<serde_json::Error> for ProcessError {
    fn from(err: serde_json::Error) -> Self {
        ProcessError::permanent(format!("Invalid payload: {}", err))
    }
}

/// Outcome of executing one queued job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    pub error: Option<ProcessError>,
    /// Explicit override of automatic retry classification
    pub should_retry: Option<bool>,
    /// Processor already wrote the backing job's terminal status
    #[serde(default)]
    pub status_recorded: bool,
}

impl ProcessResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            error: None,
            should_retry: None,
            status_recorded: false,
        }
    }

    pub fn failure(message: impl Into<String>, error: ProcessError) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error),
            should_retry: None,
            status_recorded: false,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_should_retry(mut self, should_retry: bool) -> Self {
        self.should_retry = Some(should_retry);
        self
    }

    pub fn with_status_recorded(mut self) -> Self {
        self.status_recorded = true;
        self
    }

    /// Text used to describe the failure on the backing job
    pub fn error_text(&self) -> &str {
        self.error
            .as_ref()
            .map(|e| e.message.as_str())
            .unwrap_or(self.message.as_str())
    }

    pub(crate) fn append_message(&mut self, suffix: &str) {
        if self.message.is_empty() {
            self.message = suffix.to_string();
        } else {
            self.message = format!("{} {}", self.message, suffix);
        }
    }
}
