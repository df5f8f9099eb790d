// Error types for the timeline engine

use thiserror::Error;

/// Result type alias for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Errors that can occur while fetching or mutating timeline state
///
/// Nothing here is fatal to the engine: transient, aborted, and malformed
/// failures all degrade to "no progress this cycle". Only action failures
/// are surfaced to the caller for user-visible reporting.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Network or server failure; safe to retry with unchanged cursors
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    /// The request was aborted by a subject change; never merged
    #[error("Fetch aborted")]
    Aborted,

    /// The response body could not be decoded
    #[error("Malformed page: {0}")]
    Malformed(String),

    /// A user-initiated action (e.g. ticket close) failed
    #[error("Action failed ({status}): {message}")]
    Action { status: u16, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl TimelineError {
    /// Create a transient fetch error
    pub fn transient(msg: impl Into<String>) -> Self {
        TimelineError::Transient(msg.into())
    }

    /// Create a malformed page error
    pub fn malformed(msg: impl Into<String>) -> Self {
        TimelineError::Malformed(msg.into())
    }

    /// Create an action failure
    pub fn action(status: u16, message: impl Into<String>) -> Self {
        TimelineError::Action {
            status,
            message: message.into(),
        }
    }

    /// Whether this failure may be silently swallowed by fetch paths
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TimelineError::Action { .. })
    }
}
