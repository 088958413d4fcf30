//! Server-Sent Events feed of the session collection.
//!
//! Clients receive a `sessions` event holding the full collection on
//! connect, then again after every committed change. Shipping the whole
//! collection keeps clients trivially consistent; at this scale the
//! payload is small.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use seminar_signup_core::Session;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// SSE endpoint streaming the session collection.
///
/// A subscriber that falls behind the broadcast channel misses
/// intermediate snapshots but resynchronizes on the next one, so lagged
/// receives are dropped rather than terminating the stream.
///
/// # Errors
///
/// Store failures while reading the initial snapshot map per the error
/// taxonomy; the stream itself never errors.
pub async fn session_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = state.store.subscribe();
    let snapshot = state.store.list_all().await?;

    let initial = stream::iter(snapshot_event(&snapshot).map(Ok));
    let updates = BroadcastStream::new(receiver).filter_map(|item| async move {
        match item {
            Ok(sessions) => snapshot_event(&sessions).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "session stream subscriber lagged");
                None
            }
        }
    });

    Ok(Sse::new(initial.chain(updates)).keep_alive(KeepAlive::default()))
}

fn snapshot_event(sessions: &[Session]) -> Option<Event> {
    match Event::default().event("sessions").json_data(sessions) {
        Ok(event) => Some(event),
        Err(error) => {
            tracing::error!(%error, "failed to encode session snapshot for SSE");
            None
        }
    }
}
