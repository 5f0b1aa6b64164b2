//! Exponential backoff between connection attempts.
//!
//! Every failed attempt widens the delay multiplicatively up to a cap, so a
//! recovering broker is not hammered by the whole fleet at once:
//!
//! ```text
//! delay[n] = min(initial * multiplier^(n-1), max_delay)
//! ```
//!
//! With the default reconnect policy (initial 1s, multiplier 2.0, cap 300s)
//! the schedule runs 1s, 2s, 4s, ... 256s, 300s. The controller also enforces
//! the retry cap: once `max_attempts` delays have been handed out,
//! [`Backoff::next_sleep`] returns [`BackoffError`] and the caller must give
//! up.

use std::time::Duration;

use thiserror::Error;

/// Raised when the retry cap is reached. The `u32` is the configured cap.
#[derive(Debug, Error)]
pub enum BackoffError {
    #[error("retry cap of {0} attempts exhausted")]
    AttemptsExhausted(u32),
}

/// Exponential backoff controller.
///
/// Not shared between tasks: the publisher's `connect` and the connection
/// driver each hold their own instance, built from the same reconnect policy.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the first retry; `reset` returns to this value.
    initial_delay: Duration,

    /// Delay the next `next_sleep` call will hand out.
    current_delay: Duration,

    /// Cap on the delay growth.
    max_delay: Duration,

    /// Growth factor applied after each attempt.
    multiplier: f64,

    /// Attempts handed out since construction or the last `reset`.
    attempt: u32,

    /// Hard limit on attempts.
    max_attempts: u32,
}

impl Backoff {
    /// Creates a controller with explicit timing parameters.
    ///
    /// A `multiplier` of 1.0 degenerates to a fixed delay, which is valid;
    /// values below 1.0 would shrink the delay and are clamped to 1.0.
    pub fn new(initial: Duration, max: Duration, multiplier: f64, max_attempts: u32) -> Self {
        Self {
            initial_delay: initial,
            current_delay: initial,
            max_delay: max,
            multiplier: multiplier.max(1.0),
            attempt: 0,
            max_attempts,
        }
    }

    /// Returns the delay to sleep before the next attempt and advances the
    /// schedule, or [`BackoffError::AttemptsExhausted`] once the cap is hit.
    pub fn next_sleep(&mut self) -> Result<Duration, BackoffError> {
        self.attempt += 1;
        if self.attempt > self.max_attempts {
            return Err(BackoffError::AttemptsExhausted(self.max_attempts));
        }

        let sleep = self.current_delay;

        let grown = self.current_delay.as_secs_f64() * self.multiplier;
        self.current_delay = Duration::from_secs_f64(grown).min(self.max_delay);

        Ok(sleep)
    }

    /// Returns the schedule to its initial state. Called after a successful
    /// connection so the next outage starts from the minimum delay again.
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
        self.attempt = 0;
    }

    /// Attempts handed out so far; used in "attempt x/y" log lines.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The configured retry cap.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
