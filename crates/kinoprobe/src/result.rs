//! Result and error types for Kinoprobe.

use thiserror::Error;

/// Result type for Kinoprobe operations
pub type KinoResult<T> = Result<T, KinoError>;

/// Errors that can occur in Kinoprobe
#[derive(Debug, Error)]
pub enum KinoError {
    /// Every candidate locator timed out under the requested condition
    #[error("Could not resolve element ({condition}); tried: {}", .tried.join(", "))]
    ResolutionExhausted {
        /// Condition that was waited for
        condition: String,
        /// Display form of every locator that was tried, in order
        tried: Vec<String>,
    },

    /// Programming or configuration error detected before any work began
    #[error("Precondition violated: {message}")]
    PreconditionViolation {
        /// Error message
        message: String,
    },

    /// Observed value did not match the expected invariant
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Driver or network transport failure
    #[error("Transport failure: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A retried operation kept failing until its wait ran out
    #[error("Timed out after {ms}ms waiting for {what}: {last_error}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Time spent waiting in milliseconds
        ms: u64,
        /// Failure reported by the final attempt
        last_error: String,
    },

    /// Scenario could not reach the state it needs and was skipped
    #[error("Skipped: {reason}")]
    Skipped {
        /// Why the scenario was skipped
        reason: String,
    },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KinoError {
    /// Create a precondition violation
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a transport failure
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a skip signal
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the whole run rather than one scenario
    #[must_use]
    pub const fn is_run_fatal(&self) -> bool {
        matches!(self, Self::PreconditionViolation { .. })
    }

    /// Whether this error is an ordinary per-scenario check failure
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::AssertionFailed { .. } | Self::ResolutionExhausted { .. }
        )
    }
}
