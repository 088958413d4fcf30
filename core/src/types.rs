//! Domain types for the seminar signup service.
//!
//! A [`Session`] is the unit of atomic mutation: it owns its participant
//! roster and waitlist, and every registration or removal commits a new
//! version of the whole document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a session.
///
/// Opaque string so seeded sessions can carry human-readable ids
/// (e.g. `"alvarez-2026"`) while new sessions get UUIDs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mints a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a registered student.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Mints a new random `StudentId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id (e.g. parsed from a cancellation link).
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StudentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A registered student, held in either the roster or the waitlist.
///
/// Immutable once created except for [`Student::is_promoted`], which flips
/// to `true` when the student is moved from the waitlist into the roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Opaque unique token.
    pub id: StudentId,
    /// Full name as entered on the form.
    pub name: String,
    /// Email address. The case-folded, trimmed email is the identity key
    /// for duplicate detection.
    pub email: String,
    /// Class year (free-form: `1L`, `2L`, `LLM`, ...).
    pub class_year: String,
    /// Server-observed creation instant; also the FIFO order key.
    pub registered_at: DateTime<Utc>,
    /// Set only by the promotion step.
    #[serde(default)]
    pub is_promoted: bool,
}

impl Student {
    /// Email normalized for identity comparison.
    #[must_use]
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Normalizes an email for case-insensitive identity comparison.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Which list of a session holds a student.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// The confirmed roster.
    Participants,
    /// The FIFO waitlist.
    Waitlist,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Participants => write!(f, "participants"),
            Self::Waitlist => write!(f, "waitlist"),
        }
    }
}

/// One schedulable discussion session.
///
/// Descriptive metadata, `capacity`, `is_unlimited`, and `is_active` are
/// mutated only by admin edits; the registration and removal operations
/// touch nothing but `participants` and `waitlist`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique identifier.
    pub id: SessionId,
    /// Hosting faculty member.
    pub faculty: String,
    /// Optional discussion topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Human-readable date (free-form, may be `"TBD"`).
    pub date: String,
    /// Human-readable time.
    pub time: String,
    /// Meeting location.
    pub location: String,
    /// Roster capacity. Meaningless when `is_unlimited` is set.
    pub capacity: u32,
    /// When true, capacity checks never trigger and there is no waitlist path.
    #[serde(default)]
    pub is_unlimited: bool,
    /// Controls visibility in the public listing only; the state machine
    /// ignores it.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Confirmed roster, in registration/promotion order.
    #[serde(default)]
    pub participants: Vec<Student>,
    /// FIFO waitlist, in signup order.
    #[serde(default)]
    pub waitlist: Vec<Student>,
}

const fn default_true() -> bool {
    true
}
