//! Persistence gateway for session documents.
//!
//! The [`SessionStore`] trait is the seam between the state machine and the
//! hosted document store. It is deliberately minimal: load a document with
//! its version, commit a new document contingent on that version, list and
//! subscribe to the collection, and the admin bulk operations.
//!
//! # Optimistic concurrency
//!
//! Every committed document carries a monotonically increasing [`Version`].
//! A commit with `expected = Some(v)` succeeds only while the stored version
//! is still `v`; otherwise it fails with [`StoreError::Conflict`] and the
//! caller (the [`crate::transact`] loop) re-reads and retries. This is what
//! makes invariant "exactly one promotion per freed slot" hold under
//! concurrent edits from multiple clients.
//!
//! # Dyn compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of `async fn` so the store
//! can be carried as `Arc<dyn SessionStore>` through application state.

use crate::types::{Session, SessionId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::broadcast;

/// Monotonic document version used for compare-and-swap commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly inserted document.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw version number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The version after one more commit.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The document contents.
    pub doc: T,
    /// The version the store held when this was read.
    pub version: Version,
}

/// Errors surfaced by the persistence gateway.
///
/// The taxonomy matters to callers: access-denied is surfaced to the user
/// and never retried, connectivity is retryable by explicit user action,
/// and conflicts are retried internally by the transaction primitive.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document exists for the given session id.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// An insert targeted an id that already has a document.
    #[error("session already exists: {0}")]
    AlreadyExists(SessionId),

    /// Compare-and-swap failure: the document moved underneath the caller.
    #[error("version conflict on session {session_id}: expected {expected}, found {actual}")]
    Conflict {
        /// The contended session document.
        session_id: SessionId,
        /// The version the commit was contingent on.
        expected: Version,
        /// The version actually stored.
        actual: Version,
    },

    /// The bounded internal retry budget ran out on a contended document.
    #[error("transaction on session {session_id} gave up after {attempts} conflicting commits")]
    ConflictExhausted {
        /// The contended session document.
        session_id: SessionId,
        /// How many attempts were made.
        attempts: usize,
    },

    /// The store rejected the operation for authorization reasons.
    /// Not retried; the operator must fix the store configuration.
    #[error("access denied by the document store: {0}")]
    AccessDenied(String),

    /// Network or service unavailability. Safe to retry manually.
    #[error("document store unavailable: {0}")]
    Connectivity(String),

    /// A document could not be encoded or decoded.
    #[error("session document serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether a manual retry of the same operation can reasonably succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connectivity(_) | Self::Conflict { .. } | Self::ConflictExhausted { .. }
        )
    }
}

/// Boxed future type returned by [`SessionStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Durable store plus change-notification stream for session documents.
///
/// Implementations must be `Send + Sync`; the server shares one instance
/// across all request handlers.
pub trait SessionStore: Send + Sync {
    /// Loads a session document with its current version.
    ///
    /// Returns `Ok(None)` when no document exists; `NotFound` is reserved
    /// for operations that require the document to exist.
    fn load(&self, id: SessionId) -> StoreFuture<'_, Option<Versioned<Session>>>;

    /// Commits a session document.
    ///
    /// - `expected = None`: insert a new document; fails with
    ///   [`StoreError::AlreadyExists`] if one is present.
    /// - `expected = Some(v)`: compare-and-swap update; fails with
    ///   [`StoreError::Conflict`] unless the stored version is still `v`.
    ///
    /// On success the full session collection is pushed to all subscribers.
    fn commit(&self, session: Session, expected: Option<Version>) -> StoreFuture<'_, Version>;

    /// Lists every session document, ordered by id for determinism.
    fn list_all(&self) -> StoreFuture<'_, Vec<Session>>;

    /// Deletes a session document and everything it contains.
    ///
    /// Deleting an absent id is a no-op.
    fn delete(&self, id: SessionId) -> StoreFuture<'_, ()>;

    /// Removes every session document. Admin-only.
    fn clear_all(&self) -> StoreFuture<'_, ()>;

    /// Subscribes to pushes of the full session collection.
    ///
    /// A snapshot is broadcast after every committed change. Receivers that
    /// fall behind observe [`broadcast::error::RecvError::Lagged`] and can
    /// simply keep reading; each message is a complete snapshot.
    fn subscribe(&self) -> broadcast::Receiver<Vec<Session>>;
}
