//! Wait primitive: poll a probe until it yields a value or a timeout elapses.
//!
//! The probe is always evaluated at least once, so a zero timeout means
//! "check now". Probe errors are transport failures and end the wait
//! immediately; they are never retried. [`Waiter::retry`] is the exception:
//! it treats every failed attempt as "not yet".

use crate::result::{KinoError, KinoResult};
use std::fmt;
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Outcome of one bounded wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled<T> {
    /// The probe produced a value
    Ready {
        /// Value produced by the probe
        value: T,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of probe evaluations
        polls: u32,
    },
    /// The timeout elapsed first
    TimedOut {
        /// Time spent waiting
        elapsed: Duration,
        /// Number of probe evaluations
        polls: u32,
    },
}

impl<T> Polled<T> {
    /// Time spent waiting
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Ready { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    /// Number of probe evaluations
    #[must_use]
    pub const fn polls(&self) -> u32 {
        match self {
            Self::Ready { polls, .. } | Self::TimedOut { polls, .. } => *polls,
        }
    }

    /// The value, if ready
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Blocking poller
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    poll_interval: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter {
    /// Create a waiter with the default polling interval
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Create a waiter with a custom polling interval
    #[must_use]
    pub const fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Polling interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Evaluate `probe` until it returns `Some`, or until `timeout` elapses.
    ///
    /// Blocks the calling thread for at most `timeout` plus one probe
    /// evaluation. There is no cancellation other than the timeout.
    pub fn poll<T, F>(&self, timeout: Duration, mut probe: F) -> KinoResult<Polled<T>>
    where
        F: FnMut() -> KinoResult<Option<T>>,
    {
        let start = Instant::now();
        let mut polls = 0_u32;

        loop {
            polls += 1;
            if let Some(value) = probe()? {
                return Ok(Polled::Ready {
                    value,
                    elapsed: start.elapsed(),
                    polls,
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(Polled::TimedOut { elapsed, polls });
            }
            std::thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }

    /// Call `attempt` until it succeeds or `timeout` elapses.
    ///
    /// Failures are retried. On expiry the error is [`KinoError::Timeout`]
    /// naming `what` and carrying the last failure.
    pub fn retry<T, E, F>(&self, timeout: Duration, what: &str, mut attempt: F) -> KinoResult<T>
    where
        E: fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut last_error = String::new();
        let polled = self.poll(timeout, || match attempt() {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                last_error = err.to_string();
                Ok(None)
            }
        })?;

        match polled {
            Polled::Ready { value, .. } => Ok(value),
            Polled::TimedOut { elapsed, .. } => Err(KinoError::Timeout {
                what: what.to_string(),
                ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                last_error,
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::result::KinoError;

    mod waiter_tests {
        use super::*;

        #[test]
        fn test_immediate_value_polls_once() {
            let waiter = Waiter::new();
            let polled = waiter.poll(Duration::from_secs(5), || Ok(Some(7))).unwrap();
            assert_eq!(polled.polls(), 1);
            assert_eq!(polled.into_value(), Some(7));
        }

        #[test]
        fn test_zero_timeout_still_checks_once() {
            let waiter = Waiter::new();
            let mut calls = 0;
            let polled: Polled<()> = waiter
                .poll(Duration::ZERO, || {
                    calls += 1;
                    Ok(None)
                })
                .unwrap();
            assert_eq!(calls, 1);
            assert!(matches!(polled, Polled::TimedOut { .. }));
        }

        #[test]
        fn test_timeout_respects_duration() {
            let waiter = Waiter::with_poll_interval(Duration::from_millis(5));
            let polled: Polled<()> = waiter.poll(Duration::from_millis(60), || Ok(None)).unwrap();
            assert!(polled.elapsed() >= Duration::from_millis(60));
            assert!(polled.elapsed() < Duration::from_millis(200));
            assert!(polled.polls() > 1);
        }

        #[test]
        fn test_probe_error_ends_wait() {
            let waiter = Waiter::new();
            let start = Instant::now();
            let result: KinoResult<Polled<()>> =
                waiter.poll(Duration::from_secs(5), || Err(KinoError::transport("driver gone")));
            assert!(matches!(result, Err(KinoError::Transport { .. })));
            assert!(start.elapsed() < Duration::from_secs(1));
        }
    }

    mod retry_tests {
        use super::*;

        #[test]
        fn test_retry_succeeds_after_failures() {
            let waiter = Waiter::with_poll_interval(Duration::from_millis(1));
            let mut attempts = 0;
            let value = waiter
                .retry(Duration::from_secs(2), "element 1", || {
                    attempts += 1;
                    if attempts < 3 {
                        Err("Could not find node")
                    } else {
                        Ok(attempts)
                    }
                })
                .unwrap();
            assert_eq!(value, 3);
        }

        #[test]
        fn test_retry_expiry_is_timeout_with_last_failure() {
            let waiter = Waiter::with_poll_interval(Duration::from_millis(5));
            let mut attempts = 0;
            let err = waiter
                .retry(Duration::from_millis(30), "element 9", || -> Result<(), String> {
                    attempts += 1;
                    Err(format!("miss {attempts}"))
                })
                .unwrap_err();
            match err {
                KinoError::Timeout { what, ms, last_error } => {
                    assert_eq!(what, "element 9");
                    assert!(ms >= 30);
                    assert_eq!(last_error, format!("miss {attempts}"));
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        }

        #[test]
        fn test_retry_with_zero_wait_attempts_once() {
            let waiter = Waiter::new();
            let mut attempts = 0;
            let result = waiter.retry(Duration::ZERO, "element 2", || -> Result<(), &str> {
                attempts += 1;
                Err("stale")
            });
            assert_eq!(attempts, 1);
            assert!(matches!(result, Err(KinoError::Timeout { .. })));
        }
    }

    mod integration_tests {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        #[test]
        fn test_condition_becomes_true() {
            let flag = Arc::new(AtomicBool::new(false));
            let flag_clone = flag.clone();

            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                flag_clone.store(true, Ordering::SeqCst);
            });

            let waiter = Waiter::with_poll_interval(Duration::from_millis(10));
            let polled = waiter
                .poll(Duration::from_millis(1000), || {
                    Ok(flag.load(Ordering::SeqCst).then_some(()))
                })
                .unwrap();
            assert!(matches!(polled, Polled::Ready { .. }));
        }
    }
}
