// Retry classification for failed dispatches
use crate::domain::{ErrorKind, ProcessResult};
use tracing::debug;

/// Substrings that mark an untyped error as transient (case-insensitive)
pub const RETRYABLE_KEYWORDS: [&str; 13] = [
    "timeout",
    "network",
    "socket",
    "ECONNRESET",
    "ETIMEDOUT",
    "ENOTFOUND",
    "rate limit",
    "too many requests",
    "429",
    "503",
    "temporarily unavailable",
    "retry",
    "connection",
];

/// Why a failure was (or was not) considered retryable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// Processor set `should_retry` explicitly
    Override,
    /// Typed error kind decided
    Kind(ErrorKind),
    /// Untyped message matched a keyword
    Keyword(&'static str),
    /// Untyped message matched nothing, or there was no error at all
    NoMatch,
}

/// Retry classification result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    pub retryable: bool,
    pub reason: RetryReason,
}

/// First keyword contained in `message`, if any
pub fn matching_keyword(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    RETRYABLE_KEYWORDS
        .iter()
        .copied()
        .find(|kw| lower.contains(&kw.to_lowercase()))
}

/// Decide whether a failed result should be retried
///
/// Precedence: explicit `should_retry`, then the typed error kind, then the
/// keyword list for `Unclassified` errors. A failure without an error is
/// not retried.
pub fn classify(result: &ProcessResult) -> RetryDecision {
    let decision = if let Some(flag) = result.should_retry {
        RetryDecision {
            retryable: flag,
            reason: RetryReason::Override,
        }
    } else {
        match &result.error {
            Some(err) => match err.kind {
                ErrorKind::Transient => RetryDecision {
                    retryable: true,
                    reason: RetryReason::Kind(ErrorKind::Transient),
                },
                kind @ (ErrorKind::Configuration | ErrorKind::Permanent) => RetryDecision {
                    retryable: false,
                    reason: RetryReason::Kind(kind),
                },
                ErrorKind::Unclassified => match matching_keyword(&err.message) {
                    Some(kw) => RetryDecision {
                        retryable: true,
                        reason: RetryReason::Keyword(kw),
                    },
                    None => RetryDecision {
                        retryable: false,
                        reason: RetryReason::NoMatch,
                    },
                },
            },
            None => RetryDecision {
                retryable: false,
                reason: RetryReason::NoMatch,
            },
        }
    };

    debug!(
        retryable = decision.retryable,
        reason = ?decision.reason,
        "Classified failure"
    );
    decision
}
