//! Retry policy as an explicit state machine.
//!
//! ```text
//! Attempting ──ok──────────────▶ Succeeded
//!     │ ──transient, n < max──▶ Backoff ──sleep──▶ Attempting(n + 1)
//!     │ ──transient, n = max──▶ Exhausted
//!     └ ──non-transient───────▶ Rejected
//! ```
//!
//! [`RetryPolicy::on_outcome`] is the whole transition table and is pure, so the
//! retry bound and the transient/non-transient split are testable without I/O.

use std::time::Duration;

use crate::llm_client::LlmError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always ≥ 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            attempt_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug)]
pub enum RetryState<T> {
    Attempting {
        attempt: u32,
    },
    Backoff {
        attempt: u32,
        delay: Duration,
        cause: LlmError,
    },
    Succeeded {
        attempts: u32,
        value: T,
    },
    Exhausted {
        attempts: u32,
        cause: LlmError,
    },
    Rejected {
        attempts: u32,
        cause: LlmError,
    },
}

impl<T> RetryState<T> {
    pub fn start() -> Self {
        RetryState::Attempting { attempt: 1 }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. } | RetryState::Exhausted { .. } | RetryState::Rejected { .. }
        )
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Transition out of `Attempting { attempt }` given that attempt's outcome.
    pub fn on_outcome<T>(&self, attempt: u32, outcome: Result<T, LlmError>) -> RetryState<T> {
        match outcome {
            Ok(value) => RetryState::Succeeded {
                attempts: attempt,
                value,
            },
            Err(cause) if !cause.is_transient() => RetryState::Rejected {
                attempts: attempt,
                cause,
            },
            Err(cause) if attempt >= self.max_attempts.max(1) => RetryState::Exhausted {
                attempts: attempt,
                cause,
            },
            Err(cause) => RetryState::Backoff {
                attempt,
                delay: self.backoff(attempt),
                cause,
            },
        }
    }

    /// Transition out of `Backoff { attempt }` once the delay has elapsed.
    pub fn after_backoff<T>(&self, attempt: u32) -> RetryState<T> {
        RetryState::Attempting {
            attempt: attempt + 1,
        }
    }
}
