//! Admin passcode gate.
//!
//! Every `/api/admin` route passes through [`require_admin`], which checks
//! the `x-admin-passcode` header against the configured shared passcode.
//! The comparison is constant-time so response timing leaks nothing about
//! matching prefixes.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

/// Header carrying the shared admin passcode.
pub const PASSCODE_HEADER: &str = "x-admin-passcode";

/// Middleware rejecting requests without a valid admin passcode.
///
/// When no passcode is configured the admin surface is disabled outright;
/// there is no unauthenticated fallback.
///
/// # Errors
///
/// [`AppError::forbidden`] when the passcode is unconfigured, absent, or
/// wrong.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.admin_passcode.as_deref() else {
        return Err(AppError::forbidden("The admin interface is disabled"));
    };

    let provided = request
        .headers()
        .get(PASSCODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "admin request rejected");
        Err(AppError::forbidden("Invalid admin passcode"))
    }
}
