//! Cancellable vote collection.
//!
//! Two shapes of vote run over marker events:
//! - [`ask`] blocks for a single response from a constrained audience and
//!   fails on timeout.
//! - [`collect_first`] is the open-poll loop: it records the first
//!   qualifying response but keeps its window open until the timeout
//!   elapses or it is cancelled, so a cancelled poll still resolves to the
//!   best recorded state instead of discarding it.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::platform::{Marker, MarkerEvent};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("nobody responded in time")]
    Timeout,
    #[error("vote event stream closed")]
    Closed,
}

/// How an open poll resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A participant picked this marker.
    Choice(Marker),
    /// The window closed (or was cancelled) before any qualifying response.
    NoSelection,
    /// The poll had nothing to offer and never opened.
    NoCandidates,
}

/// Handle to an in-flight background poll.
///
/// The owning train holds exactly one of these at a time. [`resolve`]
/// signals cancellation (a no-op if the poll already finished) and awaits
/// the task's forced resolution, recovering its partial result.
///
/// [`resolve`]: PollHandle::resolve
pub struct PollHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn new(cancel: oneshot::Sender<()>, task: JoinHandle<PollOutcome>) -> Self {
        Self {
            cancel: Some(cancel),
            task,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel-and-await: never discards a recorded response.
    pub async fn resolve(mut self) -> PollOutcome {
        if let Some(cancel) = self.cancel.take() {
            // The receiver is gone once the task finished; either way the
            // task is about to resolve.
            let _ = cancel.send(());
        }
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("poll task did not run to completion: {err}");
                PollOutcome::NoSelection
            }
        }
    }
}

/// Waits for one qualifying response: an offered marker from an eligible
/// responder (everyone, when `eligible` is empty). Times out with an error;
/// a missing response is never silently defaulted.
pub async fn ask(
    events: &mut mpsc::Receiver<MarkerEvent>,
    markers: &[Marker],
    eligible: &[i64],
    timeout: Duration,
) -> Result<Marker, PollError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return Err(PollError::Timeout),
            event = events.recv() => match event {
                Some(event)
                    if markers.contains(&event.marker)
                        && (eligible.is_empty() || eligible.contains(&event.user_id)) =>
                {
                    return Ok(event.marker);
                }
                Some(_) => {}
                None => return Err(PollError::Closed),
            }
        }
    }
}

/// Open-poll collection loop. Records the first qualifying response, then
/// keeps running until the window elapses, the cancel signal fires, or the
/// event stream closes. Resolution uses the recorded response if there is
/// one.
pub async fn collect_first(
    mut events: mpsc::Receiver<MarkerEvent>,
    markers: &[Marker],
    window: Duration,
    mut cancel: oneshot::Receiver<()>,
) -> PollOutcome {
    let deadline = tokio::time::Instant::now() + window;
    let mut recorded: Option<Marker> = None;
    loop {
        tokio::select! {
            _ = &mut cancel => break,
            _ = tokio::time::sleep_until(deadline) => break,
            event = events.recv() => match event {
                Some(event) if markers.contains(&event.marker) => {
                    if recorded.is_none() {
                        recorded = Some(event.marker);
                    }
                }
                Some(_) => {}
                None => break,
            }
        }
    }
    // Cancellation never discards a vote already cast: drain anything still
    // buffered before resolving.
    while let Ok(event) = events.try_recv() {
        if recorded.is_none() && markers.contains(&event.marker) {
            recorded = Some(event.marker);
        }
    }
    match recorded {
        Some(marker) => PollOutcome::Choice(marker),
        None => PollOutcome::NoSelection,
    }
}
