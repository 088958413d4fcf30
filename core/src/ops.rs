//! The operations layer: every presentation entry point (public form,
//! admin dashboard, cancellation deep link) calls through here, so the
//! waitlist/capacity rules exist exactly once.
//!
//! All mutations go through [`crate::transact::transact`], which re-reads
//! the authoritative session document and commits with a version check, so
//! two concurrent registrations for the last slot deterministically yield
//! one participant and one waitlist entry.

use crate::clock::Clock;
use crate::store::{SessionStore, StoreError};
use crate::transact::transact;
use crate::types::{ListKind, Session, SessionId, Student, StudentId, normalize_email};
use thiserror::Error;

/// Errors from the registration, removal, and admin operations.
#[derive(Error, Debug)]
pub enum SignupError {
    /// A required field was missing or empty after trimming.
    /// Rejected before any write and never partially applied.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The email already appears in this session's roster or waitlist.
    #[error("{email} is already registered for this session")]
    AlreadyRegistered {
        /// The normalized email that collided.
        email: String,
    },

    /// The persistence gateway failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for a new registration, as entered on the signup form.
#[derive(Clone, Debug)]
pub struct NewRegistration {
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Class year.
    pub class_year: String,
}

impl NewRegistration {
    /// Trims all fields and rejects empty ones.
    fn validated(self) -> Result<Self, SignupError> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();
        let class_year = self.class_year.trim().to_string();
        for (field, value) in [
            ("name", &name),
            ("email", &email),
            ("classYear", &class_year),
        ] {
            if value.is_empty() {
                return Err(SignupError::Validation(format!("{field} must not be empty")));
            }
        }
        Ok(Self {
            name,
            email,
            class_year,
        })
    }
}

/// Result of a successful registration, consumed by the confirmation view.
///
/// `session` is the snapshot the decision was made against (pre-refresh);
/// the subscription feed delivers the committed state.
#[derive(Clone, Debug)]
pub struct RegistrationOutcome {
    /// The newly minted student record.
    pub student: Student,
    /// The session snapshot the placement decision was computed on.
    pub session: Session,
    /// Whether the student landed on the waitlist rather than the roster.
    pub is_waitlist: bool,
}

/// Result of a removal, carrying the promotion signal when one occurred.
#[derive(Clone, Debug)]
pub struct RemovalOutcome {
    /// The removed student, or `None` when the id was absent (idempotent).
    pub removed: Option<Student>,
    /// The waitlist head promoted into the freed slot, if any.
    pub promoted: Option<Student>,
    /// The session document as committed by this operation.
    pub session: Session,
}

/// Result of resolving a cancellation deep link.
#[derive(Clone, Debug)]
pub enum CancellationOutcome {
    /// The student was found and removed (possibly triggering a promotion).
    Removed(RemovalOutcome),
    /// The link was already used or the registration no longer exists.
    /// Treated as success, not an error.
    AlreadyHandled,
}

/// Registers a student for a session.
///
/// The placement decision (roster vs waitlist) and the duplicate-email check
/// run inside the transaction against the authoritative document. A full
/// roster routes to the waitlist; the comparison is inclusive, so a roster
/// exactly at capacity already waitlists.
///
/// # Errors
///
/// - [`SignupError::Validation`] for empty fields, before any write.
/// - [`SignupError::AlreadyRegistered`] when the case-folded email matches
///   an existing entry in either list.
/// - [`SignupError::Store`] for gateway failures, including
///   [`StoreError::NotFound`] for an unknown session.
pub async fn register(
    store: &dyn SessionStore,
    clock: &dyn Clock,
    session_id: SessionId,
    registration: NewRegistration,
) -> Result<RegistrationOutcome, SignupError> {
    let registration = registration.validated()?;
    let student_id = StudentId::new();
    let registered_at = clock.now();

    let outcome = transact(store, session_id, |current: &Session| {
        if current.contains_email(&registration.email) {
            return Err(SignupError::AlreadyRegistered {
                email: normalize_email(&registration.email),
            });
        }
        let student = Student {
            id: student_id.clone(),
            name: registration.name.clone(),
            email: registration.email.clone(),
            class_year: registration.class_year.clone(),
            registered_at,
            is_promoted: false,
        };
        let snapshot = current.clone();
        let mut next = current.clone();
        let is_waitlist = next.place_registrant(student.clone());
        Ok((
            next,
            RegistrationOutcome {
                student,
                session: snapshot,
                is_waitlist,
            },
        ))
    })
    .await?;

    tracing::info!(
        session_id = %outcome.session.id,
        student_id = %outcome.student.id,
        is_waitlist = outcome.is_waitlist,
        "registration committed"
    );
    Ok(outcome)
}

/// Removes a student from the named list of a session, promoting the
/// waitlist head when the removal frees a roster slot.
///
/// Removal and promotion commit in the same transaction; no intermediate
/// under-capacity-with-waitlist state is ever observable. Removing an id
/// that is not in the named list is an idempotent no-op.
///
/// # Errors
///
/// [`SignupError::Store`] for gateway failures, including
/// [`StoreError::NotFound`] for an unknown session.
pub async fn remove_registrant(
    store: &dyn SessionStore,
    session_id: SessionId,
    student_id: StudentId,
    list: ListKind,
) -> Result<RemovalOutcome, SignupError> {
    let outcome = transact(store, session_id, |current: &Session| {
        let mut next = current.clone();
        let removal = next.remove_registrant(&student_id, list);
        let session = next.clone();
        Ok::<_, SignupError>((
            next,
            RemovalOutcome {
                removed: removal.removed,
                promoted: removal.promoted,
                session,
            },
        ))
    })
    .await?;

    if let Some(promoted) = &outcome.promoted {
        tracing::info!(
            session_id = %outcome.session.id,
            student_id = %promoted.id,
            student_name = %promoted.name,
            "waitlist head promoted into the roster"
        );
    }
    Ok(outcome)
}

/// Parses a cancellation token of the form `<sessionId>:<studentId>`.
///
/// # Errors
///
/// [`SignupError::Validation`] when the token does not contain two
/// non-empty parts.
pub fn parse_cancellation_token(token: &str) -> Result<(SessionId, StudentId), SignupError> {
    match token.trim().split_once(':') {
        Some((session, student)) if !session.is_empty() && !student.is_empty() => Ok((
            SessionId::from_string(session),
            StudentId::from_string(student),
        )),
        _ => Err(SignupError::Validation(
            "cancellation token must have the form <sessionId>:<studentId>".to_string(),
        )),
    }
}

/// Resolves a cancellation deep link: finds which list currently holds the
/// student and removes them from it.
///
/// The lookup and the removal run in the same transaction, so a link racing
/// a concurrent promotion still removes the student from whichever list they
/// occupy at commit time. A student present in neither list (link reused,
/// or already removed by an admin) resolves to
/// [`CancellationOutcome::AlreadyHandled`].
///
/// # Errors
///
/// - [`SignupError::Validation`] for a malformed token.
/// - [`SignupError::Store`] for gateway failures.
pub async fn resolve_cancellation(
    store: &dyn SessionStore,
    token: &str,
) -> Result<CancellationOutcome, SignupError> {
    let (session_id, student_id) = parse_cancellation_token(token)?;
    transact(store, session_id, |current: &Session| {
        let Some(list) = current.locate(&student_id) else {
            return Ok((current.clone(), CancellationOutcome::AlreadyHandled));
        };
        let mut next = current.clone();
        let removal = next.remove_registrant(&student_id, list);
        let session = next.clone();
        Ok::<_, SignupError>((
            next,
            CancellationOutcome::Removed(RemovalOutcome {
                removed: removal.removed,
                promoted: removal.promoted,
                session,
            }),
        ))
    })
    .await
}

// ============================================================================
// Admin session management
// ============================================================================

/// Descriptive fields of a session, editable by admins.
///
/// Kept separate from [`Session`] so edits can never reach the participant
/// and waitlist lists.
#[derive(Clone, Debug)]
pub struct SessionDetails {
    /// Hosting faculty member.
    pub faculty: String,
    /// Optional discussion topic.
    pub topic: Option<String>,
    /// Human-readable date.
    pub date: String,
    /// Human-readable time.
    pub time: String,
    /// Meeting location.
    pub location: String,
    /// Roster capacity.
    pub capacity: u32,
    /// Disables capacity checks and the waitlist path.
    pub is_unlimited: bool,
    /// Public-listing visibility.
    pub is_active: bool,
}

impl SessionDetails {
    fn validated(self) -> Result<Self, SignupError> {
        if self.faculty.trim().is_empty() {
            return Err(SignupError::Validation(
                "faculty must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Creates a new session with empty lists.
///
/// # Errors
///
/// - [`SignupError::Validation`] for an empty faculty name.
/// - [`SignupError::Store`] for gateway failures, including
///   [`StoreError::AlreadyExists`].
pub async fn create_session(
    store: &dyn SessionStore,
    details: SessionDetails,
) -> Result<Session, SignupError> {
    let details = details.validated()?;
    let session = Session {
        id: SessionId::new(),
        faculty: details.faculty,
        topic: details.topic,
        date: details.date,
        time: details.time,
        location: details.location,
        capacity: details.capacity,
        is_unlimited: details.is_unlimited,
        is_active: details.is_active,
        participants: Vec::new(),
        waitlist: Vec::new(),
    };
    store.commit(session.clone(), None).await?;
    tracing::info!(session_id = %session.id, faculty = %session.faculty, "session created");
    Ok(session)
}

/// Replaces the descriptive metadata of a session, leaving the roster and
/// waitlist untouched.
///
/// Changing `capacity` or `is_unlimited` does not retroactively promote or
/// demote anyone; the lists are reconsidered only by subsequent removals.
///
/// # Errors
///
/// - [`SignupError::Validation`] for an empty faculty name.
/// - [`SignupError::Store`] for gateway failures.
pub async fn update_session_details(
    store: &dyn SessionStore,
    session_id: SessionId,
    details: SessionDetails,
) -> Result<Session, SignupError> {
    let details = details.validated()?;
    transact(store, session_id, |current: &Session| {
        let next = Session {
            faculty: details.faculty.clone(),
            topic: details.topic.clone(),
            date: details.date.clone(),
            time: details.time.clone(),
            location: details.location.clone(),
            capacity: details.capacity,
            is_unlimited: details.is_unlimited,
            is_active: details.is_active,
            ..current.clone()
        };
        let committed = next.clone();
        Ok::<_, SignupError>((next, committed))
    })
    .await
}
