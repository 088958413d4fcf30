//! Atomic read-modify-write over a single session document.
//!
//! [`transact`] is the only mutation path the operations layer uses. It
//! re-reads the authoritative document at the start of every attempt, runs a
//! pure closure against that snapshot, and commits contingent on the version
//! it read. A conflicting concurrent commit triggers a bounded retry with
//! exponential backoff; the closure then observes the updated document.
//!
//! This replaces the blind-overwrite pattern (compute new lists from a
//! client-side cache, then write) which loses updates under concurrent
//! signups or removals.

use crate::store::{SessionStore, StoreError};
use crate::types::{Session, SessionId};
use std::time::Duration;
use tokio::time::sleep;

/// Maximum commit attempts before a contended transaction gives up.
pub const MAX_ATTEMPTS: usize = 10;

/// Backoff schedule for conflicting commits.
///
/// Delay for attempt `n` is `initial * multiplier^n`, capped at `max`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay after the first conflict.
    pub initial: Duration,
    /// Cap on the delay between attempts.
    pub max: Duration,
    /// Exponential growth factor.
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(250),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Delay to sleep before retrying after the given zero-based attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay_ms = (self.initial.as_millis() as f64
            * self.multiplier.powi(attempt.min(i32::MAX as usize) as i32))
            as u64;
        Duration::from_millis(delay_ms).min(self.max)
    }
}

/// Runs `apply` against the current session document and commits the result
/// atomically, retrying on version conflicts.
///
/// The closure receives the authoritative document and returns the new
/// document plus an operation result. Domain errors returned by the closure
/// abort immediately without a write; only [`StoreError::Conflict`] from the
/// commit is retried. A transaction therefore either fully applies or does
/// not apply at all.
///
/// # Errors
///
/// - [`StoreError::NotFound`] (via `E::from`) when no document exists.
/// - [`StoreError::ConflictExhausted`] when [`MAX_ATTEMPTS`] conflicting
///   commits occur back to back.
/// - Any error returned by the closure, unretried.
/// - Any non-conflict store error, unretried.
pub async fn transact<T, E, F>(
    store: &dyn SessionStore,
    id: SessionId,
    mut apply: F,
) -> Result<T, E>
where
    E: From<StoreError>,
    F: FnMut(&Session) -> Result<(Session, T), E>,
{
    let backoff = BackoffPolicy::default();
    for attempt in 0..MAX_ATTEMPTS {
        let Some(current) = store.load(id.clone()).await? else {
            return Err(StoreError::NotFound(id).into());
        };
        let (updated, result) = apply(&current.doc)?;
        match store.commit(updated, Some(current.version)).await {
            Ok(_) => return Ok(result),
            Err(StoreError::Conflict {
                expected, actual, ..
            }) => {
                tracing::debug!(
                    session_id = %id,
                    attempt,
                    %expected,
                    %actual,
                    "concurrent commit detected, retrying transaction"
                );
                sleep(backoff.delay_for_attempt(attempt)).await;
            }
            Err(other) => return Err(other.into()),
        }
    }
    Err(StoreError::ConflictExhausted {
        session_id: id,
        attempts: MAX_ATTEMPTS,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(10));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(40));
        assert_eq!(policy.delay_for_attempt(20), Duration::from_millis(250));
    }
}
