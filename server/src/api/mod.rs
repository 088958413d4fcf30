//! HTTP API handlers.
//!
//! - [`public`]: session listing, registration, cancellation deep links.
//! - [`admin`]: session management, registrant removal, seed and reset.
//! - [`stream`]: Server-Sent Events feed of the session collection.

pub mod admin;
pub mod public;
pub mod stream;
