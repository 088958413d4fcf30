//! Clock abstraction so registration timestamps are testable.

use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// Injected into the operations layer so tests can pin time with a fixed
/// clock while production uses [`SystemClock`].
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
