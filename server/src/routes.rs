//! Router configuration for the signup server.
//!
//! Builds the complete Axum router: public endpoints, the SSE feed, and
//! the passcode-gated admin surface.

use crate::api::{admin, public, stream};
use crate::auth::require_admin;
use crate::health::{health_check, readiness_check};
use crate::state::AppState;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Admin routes are nested under `/api/admin` behind the passcode
/// middleware; everything else is public. The signup page is a browser
/// client on another origin, hence the permissive CORS layer.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/sessions", get(public::list_sessions))
        .route("/sessions/:id/registrations", post(public::register))
        .route("/cancellations", post(public::cancel))
        .route("/sessions/stream", get(stream::session_stream));

    let admin_routes = Router::new()
        .route("/sessions", get(admin::list_sessions))
        .route("/sessions", post(admin::create_session))
        .route("/sessions/:id", put(admin::update_session))
        .route("/sessions/:id", delete(admin::delete_session))
        .route(
            "/sessions/:id/registrants/:student_id",
            delete(admin::remove_registrant),
        )
        .route("/seed", post(admin::seed))
        .route("/reset", post(admin::reset))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
