//! # Seminar Signup Core
//!
//! Domain model and operations for a faculty discussion signup service:
//! sessions with a capacity, a participant roster, and a FIFO waitlist.
//!
//! The crate is split along the "functional core, imperative shell" line:
//!
//! - [`types`] and [`session`] hold the pure state machine. Placing a
//!   registrant into the roster or waitlist and promoting the waitlist head
//!   on a vacancy are synchronous methods on [`types::Session`] with no I/O,
//!   testable at memory speed.
//! - [`store`] defines the [`store::SessionStore`] persistence gateway: a
//!   document store with optimistic concurrency (version-checked commits)
//!   and a push notification channel for the full session collection.
//! - [`transact`] wraps the gateway's load + compare-and-swap primitives in
//!   a bounded retry loop. Every mutation re-reads the authoritative
//!   document inside the loop; a client-side snapshot is never the mutation
//!   base, so concurrent signups and removals cannot lose updates.
//! - [`ops`] is the single operations layer shared by all presentation entry
//!   points: registration, removal with promotion, cancellation-link
//!   resolution, and admin session management.

pub mod clock;
pub mod ops;
pub mod session;
pub mod store;
pub mod transact;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use ops::{
    CancellationOutcome, NewRegistration, RegistrationOutcome, RemovalOutcome, SessionDetails,
    SignupError,
};
pub use store::{SessionStore, StoreError, Version, Versioned};
pub use types::{ListKind, Session, SessionId, Student, StudentId};
