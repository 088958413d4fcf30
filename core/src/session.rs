//! The waitlist/capacity state machine.
//!
//! Pure, synchronous mutations on a [`Session`] snapshot. The async
//! operations layer calls these inside a [`crate::transact::transact`]
//! closure, so every decision here is made against the authoritative
//! document re-read at transaction start.
//!
//! Invariants upheld by this module:
//!
//! - No two entries across roster and waitlist share a case-folded email.
//! - A registration lands in the waitlist exactly when the session is not
//!   unlimited and the roster has reached capacity (the comparison is
//!   inclusive: a full roster routes to the waitlist).
//! - Removing a roster member promotes the FIFO waitlist head, with
//!   `is_promoted` set, whenever the removal leaves the roster under
//!   capacity and the waitlist is non-empty. Both halves happen in the same
//!   snapshot mutation, so no under-capacity-with-waitlist state is ever
//!   committed.
//! - Removal of an id absent from the named list changes nothing.

use crate::types::{ListKind, Session, Student, StudentId, normalize_email};

/// Result of removing a student from a session list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Removal {
    /// The student that was removed, if the id was present.
    pub removed: Option<Student>,
    /// The waitlist head promoted into the roster, if a slot was freed.
    pub promoted: Option<Student>,
}

impl Session {
    /// Whether the roster has reached capacity.
    ///
    /// Unlimited sessions are never full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.is_unlimited && self.participants.len() as u64 >= u64::from(self.capacity)
    }

    /// Whether any entry in either list matches the given email
    /// (case-folded, trimmed).
    #[must_use]
    pub fn contains_email(&self, email: &str) -> bool {
        let key = normalize_email(email);
        self.participants
            .iter()
            .chain(self.waitlist.iter())
            .any(|s| s.email_key() == key)
    }

    /// Which list currently holds the given student, if any.
    #[must_use]
    pub fn locate(&self, student_id: &StudentId) -> Option<ListKind> {
        if self.participants.iter().any(|s| &s.id == student_id) {
            Some(ListKind::Participants)
        } else if self.waitlist.iter().any(|s| &s.id == student_id) {
            Some(ListKind::Waitlist)
        } else {
            None
        }
    }

    /// Appends a freshly minted student to the roster or, when the roster is
    /// full, to the waitlist. Returns `true` when the student was waitlisted.
    ///
    /// The other list and all metadata fields are untouched. Duplicate-email
    /// checking is the caller's responsibility (it needs the pre-insert
    /// snapshot to report which email collided).
    pub fn place_registrant(&mut self, student: Student) -> bool {
        let is_waitlist = self.is_full();
        if is_waitlist {
            self.waitlist.push(student);
        } else {
            self.participants.push(student);
        }
        is_waitlist
    }

    /// Removes the student with `student_id` from the named list and, when
    /// the removal frees a roster slot, promotes the waitlist head.
    ///
    /// Promotion runs only for a roster removal on a non-unlimited session
    /// that actually removed someone, left the roster under capacity, and
    /// found a non-empty waitlist. An id absent from the named list is an
    /// idempotent no-op.
    pub fn remove_registrant(&mut self, student_id: &StudentId, list: ListKind) -> Removal {
        match list {
            ListKind::Waitlist => Removal {
                removed: take_by_id(&mut self.waitlist, student_id),
                promoted: None,
            },
            ListKind::Participants => {
                let removed = take_by_id(&mut self.participants, student_id);
                let promoted = if removed.is_some() && !self.is_full() && !self.waitlist.is_empty()
                {
                    let mut next = self.waitlist.remove(0);
                    next.is_promoted = true;
                    self.participants.push(next.clone());
                    Some(next)
                } else {
                    None
                };
                Removal { removed, promoted }
            }
        }
    }
}

fn take_by_id(list: &mut Vec<Student>, student_id: &StudentId) -> Option<Student> {
    let index = list.iter().position(|s| &s.id == student_id)?;
    Some(list.remove(index))
}
