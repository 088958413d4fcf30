//! Application state shared across HTTP handlers.

use crate::config::Config;
use seminar_signup_core::{Clock, SessionStore};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request. Handlers reach the
/// persistence gateway only through the `SessionStore` trait, so the
/// in-memory store drops in for tests.
#[derive(Clone)]
pub struct AppState {
    /// Session document store.
    pub store: Arc<dyn SessionStore>,
    /// Clock used to timestamp registrations.
    pub clock: Arc<dyn Clock>,
    /// Server configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: Arc<Config>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }
}
