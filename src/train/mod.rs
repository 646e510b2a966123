//! The raid train core.
//!
//! A train owns a `current` and a `next` raid. Selecting a raid posts it in
//! the train's channel and immediately opens a background vote for the next
//! stop; finishing the current raid tears its postings down, resolves the
//! outstanding vote, and promotes the winner.

/// Choice board rendering
pub mod choices;
/// Cancellable vote collection
pub mod poll;
/// Process-wide instance registry
pub mod registry;
/// The train state machine
pub mod state;

pub use poll::{PollHandle, PollOutcome};
pub use registry::{InstanceCache, Registry};
pub use state::{CleanupReport, Train, TrainDeps};

use thiserror::Error;

use crate::platform::PlatformError;
use poll::PollError;

/// Failures a train operation can surface to the command layer.
///
/// `NoCurrentRaid` and `NoNextRaid` are state-invariant violations: they are
/// reported to the invoker and leave the train unchanged.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("train has no current raid to finish")]
    NoCurrentRaid,
    #[error("no next raid has been chosen yet")]
    NoNextRaid,
    #[error("no raid candidates are currently available")]
    NoCandidates,
    #[error("choice prompt failed: {0}")]
    Prompt(#[from] PollError),
    #[error("chat platform request failed: {0}")]
    Platform(#[from] PlatformError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("candidate source failed: {0}")]
    Candidates(#[source] anyhow::Error),
}
