//! Testing utilities for the seminar signup service.
//!
//! Provides:
//! - [`InMemorySessionStore`]: a fast, deterministic [`SessionStore`] with
//!   real compare-and-swap semantics, so concurrency tests exercise the
//!   same conflict/retry paths as the Postgres store.
//! - [`FixedClock`]: deterministic time for reproducible tests.
//! - [`SessionBuilder`] / [`student`]: fixture helpers.

use chrono::{DateTime, TimeZone, Utc};
use seminar_signup_core::store::{SessionStore, StoreError, StoreFuture, Version, Versioned};
use seminar_signup_core::types::{Session, SessionId, Student, StudentId};
use seminar_signup_core::Clock;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Fixed clock for deterministic tests.
///
/// Always returns the same instant, making registration timestamps (and
/// therefore FIFO ordering assertions) reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Creates a fixed clock pinned at the given instant.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Default fixed clock for tests (2025-01-01 00:00:00 UTC).
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(test_instant(0))
}

/// A deterministic instant `offset_secs` after the test epoch.
#[must_use]
pub fn test_instant(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_735_689_600 + offset_secs, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// In-memory [`SessionStore`] with per-document version checks.
///
/// Commits increment the document version and broadcast the full collection,
/// matching the production store's observable behavior. Shared across tasks
/// via `Arc` for concurrency tests.
pub struct InMemorySessionStore {
    inner: Mutex<HashMap<SessionId, Versioned<Session>>>,
    notify: broadcast::Sender<Vec<Session>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(HashMap::new()),
            notify,
        }
    }

    /// Creates a store pre-populated with the given sessions at version 1.
    #[must_use]
    pub fn with_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock_inner();
            for session in sessions {
                inner.insert(
                    session.id.clone(),
                    Versioned {
                        doc: session,
                        version: Version::FIRST,
                    },
                );
            }
        }
        store
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Versioned<Session>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_locked(inner: &HashMap<SessionId, Versioned<Session>>) -> Vec<Session> {
        let mut sessions: Vec<Session> = inner.values().map(|v| v.doc.clone()).collect();
        sessions.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        sessions
    }

    fn publish(&self, snapshot: Vec<Session>) {
        // No receivers is fine; tests often don't subscribe.
        let _ = self.notify.send(snapshot);
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, id: SessionId) -> StoreFuture<'_, Option<Versioned<Session>>> {
        Box::pin(async move { Ok(self.lock_inner().get(&id).cloned()) })
    }

    fn commit(&self, session: Session, expected: Option<Version>) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            let snapshot;
            let committed;
            {
                let mut inner = self.lock_inner();
                match (expected, inner.get(&session.id)) {
                    (None, Some(_)) => {
                        return Err(StoreError::AlreadyExists(session.id));
                    }
                    (None, None) => {
                        committed = Version::FIRST;
                        inner.insert(
                            session.id.clone(),
                            Versioned {
                                doc: session,
                                version: committed,
                            },
                        );
                    }
                    (Some(_), None) => {
                        return Err(StoreError::NotFound(session.id));
                    }
                    (Some(expected), Some(current)) => {
                        if current.version != expected {
                            return Err(StoreError::Conflict {
                                session_id: session.id,
                                expected,
                                actual: current.version,
                            });
                        }
                        committed = expected.next();
                        inner.insert(
                            session.id.clone(),
                            Versioned {
                                doc: session,
                                version: committed,
                            },
                        );
                    }
                }
                snapshot = Self::snapshot_locked(&inner);
            }
            self.publish(snapshot);
            Ok(committed)
        })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<Session>> {
        Box::pin(async move { Ok(Self::snapshot_locked(&self.lock_inner())) })
    }

    fn delete(&self, id: SessionId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let snapshot = {
                let mut inner = self.lock_inner();
                inner.remove(&id);
                Self::snapshot_locked(&inner)
            };
            self.publish(snapshot);
            Ok(())
        })
    }

    fn clear_all(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.lock_inner().clear();
            self.publish(Vec::new());
            Ok(())
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<Session>> {
        self.notify.subscribe()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Builds a [`Student`] fixture with a deterministic timestamp.
#[must_use]
pub fn student(name: &str, email: &str) -> Student {
    Student {
        id: StudentId::new(),
        name: name.to_string(),
        email: email.to_string(),
        class_year: "2L".to_string(),
        registered_at: test_instant(0),
        is_promoted: false,
    }
}

/// Builder for [`Session`] fixtures.
///
/// ```
/// use seminar_signup_testing::SessionBuilder;
///
/// let session = SessionBuilder::new("okafor-2026")
///     .faculty("Prof. Okafor")
///     .capacity(2)
///     .build();
/// assert_eq!(session.capacity, 2);
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    /// Starts a builder for a session with the given id.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            session: Session {
                id: SessionId::from_string(id),
                faculty: "Prof. Example".to_string(),
                topic: None,
                date: "March 5".to_string(),
                time: "11:30 AM".to_string(),
                location: "Room 180".to_string(),
                capacity: 10,
                is_unlimited: false,
                is_active: true,
                participants: Vec::new(),
                waitlist: Vec::new(),
            },
        }
    }

    /// Sets the faculty name.
    #[must_use]
    pub fn faculty(mut self, faculty: &str) -> Self {
        self.session.faculty = faculty.to_string();
        self
    }

    /// Sets the topic.
    #[must_use]
    pub fn topic(mut self, topic: &str) -> Self {
        self.session.topic = Some(topic.to_string());
        self
    }

    /// Sets the roster capacity.
    #[must_use]
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.session.capacity = capacity;
        self
    }

    /// Marks the session unlimited.
    #[must_use]
    pub fn unlimited(mut self) -> Self {
        self.session.is_unlimited = true;
        self
    }

    /// Hides the session from the public listing.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.session.is_active = false;
        self
    }

    /// Pre-populates the roster.
    #[must_use]
    pub fn participants(mut self, participants: Vec<Student>) -> Self {
        self.session.participants = participants;
        self
    }

    /// Pre-populates the waitlist.
    #[must_use]
    pub fn waitlist(mut self, waitlist: Vec<Student>) -> Self {
        self.session.waitlist = waitlist;
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Session {
        self.session
    }
}
