//! Admin API endpoints.
//!
//! All routes here sit behind the passcode middleware:
//! - GET /api/admin/sessions - List all sessions, inactive included
//! - POST /api/admin/sessions - Create a session
//! - PUT /api/admin/sessions/:id - Edit session metadata
//! - DELETE /api/admin/sessions/:id - Delete a session
//! - DELETE /api/admin/sessions/:id/registrants/:student_id - Remove a registrant
//! - POST /api/admin/seed - Seed an empty store
//! - POST /api/admin/reset - Wipe and reseed

use crate::error::AppError;
use crate::seed::seed_if_empty;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use seminar_signup_core::{
    ListKind, Session, SessionDetails, SessionId, Student, StudentId, ops,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Session metadata accepted on create and update.
///
/// The participant and waitlist lists are deliberately absent: admin edits
/// can never write them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpsertRequest {
    /// Hosting faculty member.
    pub faculty: String,
    /// Optional discussion topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Human-readable date, `TBD` allowed.
    pub date: String,
    /// Human-readable time, `TBD` allowed.
    pub time: String,
    /// Meeting location.
    pub location: String,
    /// Roster capacity.
    pub capacity: u32,
    /// Disables capacity checks and the waitlist path.
    #[serde(default)]
    pub is_unlimited: bool,
    /// Public-listing visibility.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

impl From<SessionUpsertRequest> for SessionDetails {
    fn from(request: SessionUpsertRequest) -> Self {
        Self {
            faculty: request.faculty,
            topic: request.topic,
            date: request.date,
            time: request.time,
            location: request.location,
            capacity: request.capacity,
            is_unlimited: request.is_unlimited,
            is_active: request.is_active,
        }
    }
}

/// Which list to remove a registrant from.
#[derive(Debug, Deserialize)]
pub struct RemoveRegistrantQuery {
    /// `participants` or `waitlist`.
    pub list: ListKind,
}

/// Response after removing a registrant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRegistrantResponse {
    /// The removed student, absent when the id was not in the named list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<Student>,
    /// The student promoted into the freed slot, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<Student>,
    /// The session after the removal committed.
    pub session: Session,
}

/// Response after seeding or resetting.
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    /// How many sessions were inserted.
    pub seeded: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List every session, inactive ones included.
///
/// # Errors
///
/// Store failures map per the error taxonomy.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Session>>, AppError> {
    Ok(Json(state.store.list_all().await?))
}

/// Create a session with empty lists.
///
/// # Errors
///
/// 422 for an empty faculty name; store failures per the taxonomy.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<SessionUpsertRequest>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let session = ops::create_session(state.store.as_ref(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Replace the metadata of a session. The roster and waitlist are left
/// untouched; raising capacity promotes nobody retroactively.
///
/// # Errors
///
/// 404 for an unknown session, 422 for an empty faculty name.
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SessionUpsertRequest>,
) -> Result<Json<Session>, AppError> {
    let session = ops::update_session_details(
        state.store.as_ref(),
        SessionId::from_string(session_id),
        request.into(),
    )
    .await?;
    Ok(Json(session))
}

/// Delete a session document outright. Deleting an absent id is a no-op.
///
/// # Errors
///
/// Store failures per the taxonomy.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .delete(SessionId::from_string(session_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a registrant from the named list, promoting the waitlist head
/// when the removal frees a roster slot.
///
/// Removing an id that is not in the named list is a no-op and still
/// returns 200, with `removed` absent.
///
/// # Errors
///
/// 404 for an unknown session; store failures per the taxonomy.
pub async fn remove_registrant(
    State(state): State<AppState>,
    Path((session_id, student_id)): Path<(String, String)>,
    Query(query): Query<RemoveRegistrantQuery>,
) -> Result<Json<RemoveRegistrantResponse>, AppError> {
    let outcome = ops::remove_registrant(
        state.store.as_ref(),
        SessionId::from_string(session_id),
        StudentId::from_string(student_id),
        query.list,
    )
    .await?;
    Ok(Json(RemoveRegistrantResponse {
        removed: outcome.removed,
        promoted: outcome.promoted,
        session: outcome.session,
    }))
}

/// Seed the initial sessions into an empty store. A populated store is
/// left untouched and reports zero.
///
/// # Errors
///
/// Store failures per the taxonomy.
pub async fn seed(State(state): State<AppState>) -> Result<Json<SeedResponse>, AppError> {
    let seeded = seed_if_empty(state.store.as_ref()).await?;
    Ok(Json(SeedResponse { seeded }))
}

/// Wipe every session document and reseed the initial set.
///
/// # Errors
///
/// Store failures per the taxonomy.
pub async fn reset(State(state): State<AppState>) -> Result<Json<SeedResponse>, AppError> {
    state.store.clear_all().await?;
    tracing::info!("store cleared by admin reset");
    let seeded = seed_if_empty(state.store.as_ref()).await?;
    Ok(Json(SeedResponse { seeded }))
}
