//! Bounded, strictly sequential retry with a fixed delay.
//!
//! Both the status read and the status write go through [`retry`], each with
//! its own [`RetryPolicy`]. A policy carries the attempt budget, the pause
//! between attempts, and the attempt at which a failure stops being a
//! warning and gets logged as an error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

// ── RetryPolicy ──────────────────────────────────────────────────────

/// How many times to try a device operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,

    /// Pause after a failed attempt, before the next one. Zero means retry
    /// immediately.
    pub delay: Duration,

    /// 1-based attempt whose failure is logged at error severity.
    pub escalate_after: u32,
}

impl RetryPolicy {
    /// Status reads: 5 attempts, 1s apart, error log on the 3rd failure.
    pub const fn read_default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
            escalate_after: 3,
        }
    }

    /// Status writes: 5 attempts back to back, error log on the 3rd failure.
    pub const fn write_default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::ZERO,
            escalate_after: 3,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::read_default()
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────

/// A successful operation and the attempt it succeeded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Every attempt failed. Carries the error from the final attempt.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

// ── retry ────────────────────────────────────────────────────────────

/// Run `op` until it succeeds or `policy` runs out of attempts.
///
/// `device` and `operation` only feed the log records. Attempts never
/// overlap: the next one starts after the previous one resolved and the
/// policy delay elapsed. No delay follows the final attempt.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    device: &str,
    operation: &'static str,
    mut op: F,
) -> Result<Retried<T>, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(device, operation, attempt, "device operation recovered");
                }
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(e) => {
                if attempt == policy.escalate_after {
                    error!(device, operation, attempt, error = %e, "device operation keeps failing");
                } else {
                    warn!(device, operation, attempt, error = %e, "device operation failed");
                }

                if attempt >= max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }

                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
