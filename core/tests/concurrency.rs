//! Races on a single session document must never lose updates.
//!
//! These tests pin the transactional compare-and-swap behavior: concurrent
//! registrations and removals from separate tasks all go through the retry
//! loop against a shared store, and the committed document must satisfy the
//! capacity and promotion rules regardless of interleaving.

#![allow(clippy::unwrap_used, clippy::panic)]

use seminar_signup_core::ops::{self, NewRegistration};
use seminar_signup_core::store::{StoreError, StoreFuture, Version, Versioned};
use seminar_signup_core::transact::MAX_ATTEMPTS;
use seminar_signup_core::types::{ListKind, Session, SessionId};
use seminar_signup_core::{SessionStore, SignupError, SystemClock};
use seminar_signup_testing::{student, InMemorySessionStore, SessionBuilder};
use std::sync::Arc;
use tokio::sync::broadcast;

fn registration(n: usize) -> NewRegistration {
    NewRegistration {
        name: format!("Student {n}"),
        email: format!("student{n}@example.edu"),
        class_year: "1L".to_string(),
    }
}

#[tokio::test]
async fn last_slot_race_yields_one_participant_and_one_waitlisted() {
    let store = Arc::new(InMemorySessionStore::with_sessions([SessionBuilder::new(
        "race",
    )
    .capacity(1)
    .build()]));

    let mut handles = Vec::new();
    for n in 0..2 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            ops::register(
                store.as_ref(),
                &SystemClock,
                SessionId::from_string("race"),
                registration(n),
            )
            .await
        }));
    }
    let outcomes: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    // Exactly one confirmed, one waitlisted, deterministically.
    let waitlisted = outcomes.iter().filter(|o| o.is_waitlist).count();
    assert_eq!(waitlisted, 1);

    let committed = store
        .load(SessionId::from_string("race"))
        .await
        .unwrap()
        .unwrap()
        .doc;
    assert_eq!(committed.participants.len(), 1);
    assert_eq!(committed.waitlist.len(), 1);
}

#[tokio::test]
async fn many_concurrent_registrations_never_oversell() {
    let capacity = 3;
    let store = Arc::new(InMemorySessionStore::with_sessions([SessionBuilder::new(
        "burst",
    )
    .capacity(capacity)
    .build()]));

    let mut handles = Vec::new();
    for n in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            ops::register(
                store.as_ref(),
                &SystemClock,
                SessionId::from_string("burst"),
                registration(n),
            )
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let committed = store
        .load(SessionId::from_string("burst"))
        .await
        .unwrap()
        .unwrap()
        .doc;
    assert_eq!(committed.participants.len(), capacity as usize);
    assert_eq!(committed.waitlist.len(), 10 - capacity as usize);
}

#[tokio::test]
async fn concurrent_removals_promote_each_slot_exactly_once() {
    let (a, b) = (
        student("Ada", "ada@example.edu"),
        student("Ben", "ben@example.edu"),
    );
    let (c, d) = (
        student("Cal", "cal@example.edu"),
        student("Dee", "dee@example.edu"),
    );
    let store = Arc::new(InMemorySessionStore::with_sessions([SessionBuilder::new(
        "promote",
    )
    .capacity(2)
    .participants(vec![a.clone(), b.clone()])
    .waitlist(vec![c.clone(), d.clone()])
    .build()]));

    let mut handles = Vec::new();
    for target in [a.id.clone(), b.id.clone()] {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            ops::remove_registrant(
                store.as_ref(),
                SessionId::from_string("promote"),
                target,
                ListKind::Participants,
            )
            .await
        }));
    }
    let outcomes: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    // Each removal promoted exactly one student, and never the same one.
    let promoted: Vec<_> = outcomes
        .iter()
        .map(|o| o.promoted.clone().unwrap().id)
        .collect();
    assert_ne!(promoted[0], promoted[1]);

    let committed = store
        .load(SessionId::from_string("promote"))
        .await
        .unwrap()
        .unwrap()
        .doc;
    assert_eq!(committed.participants.len(), 2);
    assert!(committed.waitlist.is_empty());
    assert!(committed.participants.iter().all(|s| s.is_promoted));
    let roster_ids: Vec<_> = committed.participants.iter().map(|s| s.id.clone()).collect();
    assert!(roster_ids.contains(&c.id));
    assert!(roster_ids.contains(&d.id));
}

#[tokio::test]
async fn duplicate_email_race_admits_only_one() {
    let store = Arc::new(InMemorySessionStore::with_sessions([SessionBuilder::new(
        "dup",
    )
    .capacity(5)
    .build()]));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            ops::register(
                store.as_ref(),
                &SystemClock,
                SessionId::from_string("dup"),
                NewRegistration {
                    name: "Jane Doe".to_string(),
                    email: "JANE@example.edu".to_string(),
                    class_year: "3L".to_string(),
                },
            )
            .await
        }));
    }
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let committed = store
        .load(SessionId::from_string("dup"))
        .await
        .unwrap()
        .unwrap()
        .doc;
    assert_eq!(committed.participants.len() + committed.waitlist.len(), 1);
}

/// Store whose every commit reports a version conflict, for pinning the
/// bounded retry budget.
struct ContendedStore {
    doc: Versioned<Session>,
    notify: broadcast::Sender<Vec<Session>>,
}

impl ContendedStore {
    fn new(session: Session) -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            doc: Versioned {
                doc: session,
                version: Version::FIRST,
            },
            notify,
        }
    }
}

impl SessionStore for ContendedStore {
    fn load(&self, _id: SessionId) -> StoreFuture<'_, Option<Versioned<Session>>> {
        Box::pin(async move { Ok(Some(self.doc.clone())) })
    }

    fn commit(&self, session: Session, expected: Option<Version>) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            let expected = expected.unwrap_or(Version::FIRST);
            Err(StoreError::Conflict {
                session_id: session.id,
                expected,
                actual: expected.next(),
            })
        })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<Session>> {
        Box::pin(async move { Ok(vec![self.doc.doc.clone()]) })
    }

    fn delete(&self, _id: SessionId) -> StoreFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn clear_all(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<Session>> {
        self.notify.subscribe()
    }
}

#[tokio::test(start_paused = true)]
async fn unending_contention_exhausts_the_retry_budget() {
    let store = ContendedStore::new(SessionBuilder::new("contended").capacity(5).build());

    let err = ops::register(
        &store,
        &SystemClock,
        SessionId::from_string("contended"),
        registration(0),
    )
    .await
    .unwrap_err();

    match err {
        SignupError::Store(StoreError::ConflictExhausted { attempts, .. }) => {
            assert_eq!(attempts, MAX_ATTEMPTS);
        }
        other => panic!("expected ConflictExhausted, got {other}"),
    }
}
