//! Resolution engine: turn a candidate list and a condition into one handle.
//!
//! Candidates are tried strictly in list order. Each one gets its own
//! `per_attempt_timeout`; the first candidate that satisfies the condition
//! wins and no later candidate is queried. If every candidate times out the
//! result is [`Resolution::Exhausted`], which is a reported outcome rather
//! than an error, so callers choose between failing and degrading.
//!
//! # Latency
//!
//! Worst case is `candidates.len() * per_attempt_timeout` (plus one poll
//! interval per candidate). A list of five selectors at 15s each can block
//! for over a minute before reporting exhaustion. Keep lists short and put
//! the most stable selector first.

use crate::condition::{Condition, Resolved};
use crate::driver::{Driver, ElementHandle};
use crate::locator::{CandidateList, Locator};
use crate::result::{KinoError, KinoResult};
use crate::wait::{Polled, Waiter};
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one candidate's bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Condition satisfied
    Resolved,
    /// Timeout elapsed
    TimedOut,
}

/// One `(locator, condition, timeout)` trial within a single resolve call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionAttempt {
    /// Locator tried
    pub locator: Locator,
    /// Timeout it was given
    pub timeout: Duration,
    /// Time actually spent
    pub elapsed: Duration,
    /// Driver queries made
    pub polls: u32,
    /// What happened
    pub outcome: AttemptOutcome,
}

/// Result of [`Resolver::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A candidate satisfied the condition
    Success {
        /// What the condition produced
        resolved: Resolved,
        /// Candidate that matched
        matched: Locator,
        /// Every attempt made, the matching one last
        attempts: Vec<ResolutionAttempt>,
    },
    /// Every candidate timed out
    Exhausted {
        /// Condition that was waited for
        condition: Condition,
        /// One timed-out attempt per candidate, in list order
        tried: Vec<ResolutionAttempt>,
    },
}

impl Resolution {
    /// True for [`Resolution::Success`]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Candidate that matched, if any
    #[must_use]
    pub const fn matched(&self) -> Option<&Locator> {
        match self {
            Self::Success { matched, .. } => Some(matched),
            Self::Exhausted { .. } => None,
        }
    }

    /// Every attempt made, in order
    #[must_use]
    pub fn attempts(&self) -> &[ResolutionAttempt] {
        match self {
            Self::Success { attempts, .. } => attempts,
            Self::Exhausted { tried, .. } => tried,
        }
    }

    /// Total time spent across attempts
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.attempts().iter().map(|a| a.elapsed).sum()
    }

    /// Convert exhaustion into [`KinoError::ResolutionExhausted`]
    pub fn into_result(self) -> KinoResult<(Resolved, Locator)> {
        match self {
            Self::Success {
                resolved, matched, ..
            } => Ok((resolved, matched)),
            Self::Exhausted { condition, tried } => Err(KinoError::ResolutionExhausted {
                condition: condition.to_string(),
                tried: tried.iter().map(|a| a.locator.to_string()).collect(),
            }),
        }
    }

    /// Like [`Resolution::into_result`], keeping only the (first) element
    pub fn into_element(self) -> KinoResult<ElementHandle> {
        let (resolved, matched) = self.into_result()?;
        resolved.into_element().ok_or_else(|| {
            KinoError::precondition(format!("condition on {matched} does not yield an element"))
        })
    }
}

/// The fallback-and-wait engine. Holds no state between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    waiter: Waiter,
}

impl Resolver {
    /// Create a resolver with the default polling interval
    #[must_use]
    pub const fn new() -> Self {
        Self {
            waiter: Waiter::new(),
        }
    }

    /// Create a resolver with a custom waiter
    #[must_use]
    pub const fn with_waiter(waiter: Waiter) -> Self {
        Self { waiter }
    }

    /// Resolve `candidates` under `condition`.
    ///
    /// # Errors
    ///
    /// - [`KinoError::PreconditionViolation`] for an empty list, before any query.
    /// - Driver errors, which end resolution without trying further candidates.
    ///
    /// Exhaustion is not an error; see [`Resolution::into_result`].
    pub fn resolve<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        candidates: &CandidateList,
        condition: &Condition,
        per_attempt_timeout: Duration,
    ) -> KinoResult<Resolution> {
        if candidates.is_empty() {
            return Err(KinoError::precondition(format!(
                "empty candidate list for condition '{condition}'"
            )));
        }

        let mut attempts = Vec::with_capacity(candidates.len());
        for locator in candidates {
            let polled = self
                .waiter
                .poll(per_attempt_timeout, || condition.evaluate(driver, locator))?;

            let mut attempt = ResolutionAttempt {
                locator: locator.clone(),
                timeout: per_attempt_timeout,
                elapsed: polled.elapsed(),
                polls: polled.polls(),
                outcome: AttemptOutcome::TimedOut,
            };

            match polled {
                Polled::Ready { value, .. } => {
                    debug!(
                        locator = %locator,
                        condition = %condition,
                        elapsed_ms = attempt.elapsed.as_millis() as u64,
                        "resolved"
                    );
                    attempt.outcome = AttemptOutcome::Resolved;
                    attempts.push(attempt);
                    return Ok(Resolution::Success {
                        resolved: value,
                        matched: locator.clone(),
                        attempts,
                    });
                }
                Polled::TimedOut { .. } => {
                    debug!(locator = %locator, condition = %condition, "candidate timed out");
                    attempts.push(attempt);
                }
            }
        }

        warn!(
            candidates = %candidates,
            condition = %condition,
            "all candidates exhausted"
        );
        Ok(Resolution::Exhausted {
            condition: condition.clone(),
            tried: attempts,
        })
    }
}
