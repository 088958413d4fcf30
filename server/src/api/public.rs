//! Public API endpoints.
//!
//! - GET /api/sessions - List active sessions
//! - POST /api/sessions/:id/registrations - Register for a session
//! - POST /api/cancellations - Resolve a cancellation deep link

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use seminar_signup_core::{
    CancellationOutcome, NewRegistration, Session, SessionId, Student, StudentId, ops,
};
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to register for a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Full name.
    pub name: String,
    /// Email address, matched case-insensitively against existing entries.
    pub email: String,
    /// Class year or program, free-form.
    pub class_year: String,
}

/// Response after a successful registration.
///
/// Registrants get no email, so `cancellation_url` in this response is the
/// only handle they ever hold on their registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// The newly minted registrant.
    pub student: Student,
    /// The session as it looked when the registration was placed.
    pub session: Session,
    /// Whether the registrant landed on the waitlist instead of the roster.
    pub is_waitlist: bool,
    /// Self-service cancellation deep link.
    pub cancellation_url: String,
    /// Google Calendar template link for the session.
    pub calendar_url: String,
}

/// Request to resolve a cancellation deep link.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Token of the form `<sessionId>:<studentId>`.
    pub token: String,
}

/// Response after resolving a cancellation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// `removed` or `already_handled`.
    pub status: String,
    /// The student promoted from the waitlist, if the removal freed a slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<Student>,
    /// The session after the cancellation committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List sessions visible to the public signup page.
///
/// Inactive sessions are omitted; they remain reachable for registration
/// through a direct link to keep previously shared links working.
///
/// # Errors
///
/// Store failures map to 403/500/503 per the error taxonomy.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Session>>, AppError> {
    let sessions = state.store.list_all().await?;
    Ok(Json(
        sessions.into_iter().filter(|s| s.is_active).collect(),
    ))
}

/// Register for a session.
///
/// Returns 201 with roster-or-waitlist placement and the links the
/// registrant must save.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/sessions/alvarez-2026/registrations \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Ann Lee", "email": "ann@example.edu", "classYear": "2L"}'
/// ```
///
/// # Errors
///
/// 422 for empty fields, 409 for a duplicate email, 404 for an unknown
/// session, 503 when the store stays contended or unreachable.
pub async fn register(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let outcome = ops::register(
        state.store.as_ref(),
        state.clock.as_ref(),
        SessionId::from_string(session_id),
        NewRegistration {
            name: request.name,
            email: request.email,
            class_year: request.class_year,
        },
    )
    .await?;

    let cancellation_url = cancellation_url(
        &state.config.public_base_url,
        &outcome.session.id,
        &outcome.student.id,
    );
    let calendar_url = calendar_url(&outcome.session);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            student: outcome.student,
            session: outcome.session,
            is_waitlist: outcome.is_waitlist,
            cancellation_url,
            calendar_url,
        }),
    ))
}

/// Resolve a cancellation deep link.
///
/// Idempotent: a reused link reports `already_handled` rather than failing.
///
/// # Errors
///
/// 422 for a malformed token, 404 for an unknown session, 503 for store
/// unavailability.
pub async fn cancel(
    State(state): State<AppState>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, AppError> {
    let outcome = ops::resolve_cancellation(state.store.as_ref(), &request.token).await?;
    let response = match outcome {
        CancellationOutcome::Removed(removal) => CancelResponse {
            status: "removed".to_string(),
            promoted: removal.promoted,
            session: Some(removal.session),
        },
        CancellationOutcome::AlreadyHandled => CancelResponse {
            status: "already_handled".to_string(),
            promoted: None,
            session: None,
        },
    };
    Ok(Json(response))
}

// ============================================================================
// Link construction
// ============================================================================

/// Builds the `?cancel=<sessionId>:<studentId>` deep link against the
/// configured public base URL.
fn cancellation_url(base: &str, session_id: &SessionId, student_id: &StudentId) -> String {
    let token = format!("{}:{}", session_id.as_str(), student_id.as_str());
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("cancel", &token);
            url.to_string()
        }
        // A relative or malformed base still yields a usable link.
        Err(_) => format!("{base}?cancel={token}"),
    }
}

/// Builds a Google Calendar event-template link for a session.
fn calendar_url(session: &Session) -> String {
    Url::parse_with_params(
        "https://www.google.com/calendar/render",
        &[
            ("action", "TEMPLATE"),
            ("text", &format!("Seminar: {}", session.faculty)),
            ("details", session.topic.as_deref().unwrap_or("")),
            ("location", &session.location),
        ],
    )
    .map(|url| url.to_string())
    .unwrap_or_default()
}
