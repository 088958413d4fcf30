//! # Seminar Signup Server
//!
//! Axum HTTP server for the seminar signup service. The interesting
//! domain logic lives in `seminar-signup-core`; this crate is the
//! imperative shell: configuration, the HTTP surface, the admin passcode
//! gate, and the SSE change feed.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod routes;
pub mod seed;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
