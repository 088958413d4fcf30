//! Initial session data and seeding.

use seminar_signup_core::{Session, SessionId, SessionStore, StoreError};

/// The sessions installed by seeding an empty store.
///
/// Dates and times are free-form display strings, not parsed timestamps;
/// "TBD" is a valid value for a session still being scheduled.
#[must_use]
pub fn initial_sessions() -> Vec<Session> {
    vec![
        Session {
            id: SessionId::from_string("alvarez-2026"),
            faculty: "Prof. Elena Alvarez".to_string(),
            topic: Some("Free speech doctrine and platform moderation".to_string()),
            date: "February 18".to_string(),
            time: "2:00 PM".to_string(),
            location: "Room 180".to_string(),
            capacity: 10,
            is_unlimited: false,
            is_active: true,
            participants: Vec::new(),
            waitlist: Vec::new(),
        },
        Session {
            id: SessionId::from_string("okafor-2026"),
            faculty: "Prof. Daniel Okafor".to_string(),
            topic: None,
            date: "Thursday, March 5".to_string(),
            time: "11:30 AM - 1:00 PM".to_string(),
            location: "Room 290".to_string(),
            capacity: 0,
            is_unlimited: false,
            is_active: true,
            participants: Vec::new(),
            waitlist: Vec::new(),
        },
        Session {
            id: SessionId::from_string("nakamura-2026"),
            faculty: "Prof. Keiko Nakamura".to_string(),
            topic: Some("Immigration enforcement; immigration policy".to_string()),
            date: "April 16".to_string(),
            time: "12:45 - 2:00 PM".to_string(),
            location: "Room 180".to_string(),
            capacity: 10,
            is_unlimited: true,
            is_active: true,
            participants: Vec::new(),
            waitlist: Vec::new(),
        },
        Session {
            id: SessionId::from_string("whitfield-2026"),
            faculty: "Prof. Margaret Whitfield".to_string(),
            topic: None,
            date: "TBD".to_string(),
            time: "TBD".to_string(),
            location: "Faculty residence".to_string(),
            capacity: 0,
            is_unlimited: false,
            is_active: true,
            participants: Vec::new(),
            waitlist: Vec::new(),
        },
    ]
}

/// Seeds the initial sessions when the store holds no documents.
///
/// Returns how many sessions were inserted (zero when the store was
/// non-empty). A concurrent seeder inserting the same id is tolerated;
/// the losing insert is skipped rather than failed.
///
/// # Errors
///
/// [`StoreError`] when the store cannot be read or written.
pub async fn seed_if_empty(store: &dyn SessionStore) -> Result<usize, StoreError> {
    if !store.list_all().await?.is_empty() {
        return Ok(0);
    }

    let mut seeded = 0;
    for session in initial_sessions() {
        match store.commit(session.clone(), None).await {
            Ok(_) => seeded += 1,
            Err(StoreError::AlreadyExists(id)) => {
                tracing::debug!(session_id = %id, "seed lost insert race, skipping");
            }
            Err(other) => return Err(other),
        }
    }

    tracing::info!(count = seeded, "seeded initial sessions");
    Ok(seeded)
}
