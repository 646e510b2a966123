//! The train state machine.
//!
//! Lifecycle: a fresh train has neither a current nor a next raid. The first
//! selection sets `current` and opens a background vote for `next`; finishing
//! the current raid resolves that vote, tears down the current raid's
//! postings, and promotes the winner, which in turn opens the next vote.
//! A train holds at most one outstanding poll at a time.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::database::models::TrainRecord;
use crate::platform::{ChannelId, ChatPlatform, Marker, MessageRef};
use crate::raids::Raid;
use crate::services::candidates::RaidCandidateSource;
use crate::services::travel::TravelTimeService;
use crate::train::choices::{render_choices, travel_lookup};
use crate::train::poll::{self, PollHandle, PollOutcome};
use crate::train::registry::InstanceCache;
use crate::train::TrainError;

/// Marker attached to new-raid announcements: tap to push the raid as a
/// next-stop suggestion.
pub const VOTE_NEXT_MARKER: &str = "\u{2b06}\u{fe0f}";

/// Everything a train needs to talk to the outside world. Cheap to clone;
/// shared by all trains in the process.
#[derive(Clone)]
pub struct TrainDeps {
    pub pool: SqlitePool,
    pub platform: Arc<dyn ChatPlatform>,
    pub travel: Arc<dyn TravelTimeService>,
    pub candidates: Arc<dyn RaidCandidateSource>,
    pub raids: Arc<InstanceCache<String, Raid>>,
    pub poll_window: Duration,
    pub prompt_timeout: Duration,
}

#[derive(Default)]
struct TrainState {
    current_raid: Option<Arc<Raid>>,
    next_raid: Option<Arc<Raid>>,
    poll: Option<PollHandle>,
}

/// Per-message results of a best-effort teardown. Failures are logged and
/// reported, never propagated.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub deleted: Vec<MessageRef>,
    pub failed: Vec<(MessageRef, String)>,
}

/// One raid train: a dedicated channel riding through a sequence of raids
/// picked by vote.
pub struct Train {
    pub id: i64,
    pub guild_id: i64,
    pub channel_id: ChannelId,
    pub report_channel_id: ChannelId,
    deps: TrainDeps,
    state: Mutex<TrainState>,
}

impl Train {
    pub fn new(
        id: i64,
        guild_id: i64,
        channel_id: ChannelId,
        report_channel_id: ChannelId,
        deps: TrainDeps,
    ) -> Self {
        Self {
            id,
            guild_id,
            channel_id,
            report_channel_id,
            deps,
            state: Mutex::new(TrainState::default()),
        }
    }

    pub async fn current_raid(&self) -> Option<Arc<Raid>> {
        self.state.lock().await.current_raid.clone()
    }

    pub async fn next_raid(&self) -> Option<Arc<Raid>> {
        self.state.lock().await.next_raid.clone()
    }

    async fn to_record(&self) -> TrainRecord {
        let state = self.state.lock().await;
        TrainRecord::new(
            self.id,
            self.guild_id,
            self.channel_id.to_string(),
            self.report_channel_id.to_string(),
            state.current_raid.as_ref().map(|r| r.id.clone()),
            state.next_raid.as_ref().map(|r| r.id.clone()),
        )
    }

    /// Persists the train. Called on every state transition.
    pub async fn upsert(&self) -> Result<(), TrainError> {
        self.to_record().await.upsert(&self.deps.pool).await?;
        Ok(())
    }

    /// All raids currently visible in the report channel, resolved to their
    /// canonical instances. Empty when the report channel has none.
    pub async fn possible_raids(&self) -> Result<Vec<Arc<Raid>>, TrainError> {
        let ids = self
            .deps
            .candidates
            .list_visible_raid_ids(self.report_channel_id)
            .await
            .map_err(TrainError::Candidates)?;
        let mut raids = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(raid) = self.deps.raids.get(&id) {
                raids.push(raid);
                continue;
            }
            match Raid::load(&self.deps.pool, &id).await? {
                Some(raid) => raids.push(self.deps.raids.get_or_create(id, || raid)),
                None => {
                    warn!(raid_id = %id, "raid listed in report channel but missing from storage")
                }
            }
        }
        Ok(raids)
    }

    /// Commits `raid` as the train's current stop: posts its card in the
    /// train channel, records the posting on the raid, persists both sides,
    /// then opens the background vote for the next stop.
    ///
    /// Always appends a fresh posting; several trains may select the same
    /// raid independently.
    pub async fn select_raid(self: &Arc<Self>, raid: Arc<Raid>) -> Result<(), TrainError> {
        raid.add_channel(self.channel_id).await;
        let card = raid.card(None).await;
        let message = self
            .deps
            .platform
            .send_message(self.channel_id, &card)
            .await?;
        self.deps
            .platform
            .attach_markers(&message, &Raid::rsvp_markers())
            .await?;
        raid.add_posting(message).await;
        raid.upsert(&self.deps.pool).await?;

        {
            let mut state = self.state.lock().await;
            state.current_raid = Some(raid);
            state.next_raid = None;
        }
        self.upsert().await?;
        info!(train_id = self.id, "raid selected, opening next-raid vote");

        self.spawn_next_poll().await;
        Ok(())
    }

    /// Presents the possible raids to `author` alone and commits their
    /// choice. Used once, at train creation.
    pub async fn select_first_raid(self: &Arc<Self>, author_id: i64) -> Result<(), TrainError> {
        let raids = self.possible_raids().await?;
        if raids.is_empty() {
            return Err(TrainError::NoCandidates);
        }
        let board = render_choices(&raids, None, self.deps.travel.as_ref()).await;
        let text = format!("Select your first raid from the list below\n\n{}", board.text);
        let message = self
            .deps
            .platform
            .send_message(self.channel_id, &text)
            .await?;
        self.deps
            .platform
            .attach_markers(&message, &board.markers)
            .await?;
        let mut events = self.deps.platform.subscribe_markers(&message).await?;

        let marker = poll::ask(
            &mut events,
            &board.markers,
            &[author_id],
            self.deps.prompt_timeout,
        )
        .await?;
        let chosen = marker_choice(&board.markers, &marker, &raids)
            .ok_or(TrainError::NoCandidates)?;
        self.select_raid(chosen).await
    }

    /// Opens the next-raid vote over every possible raid except the current
    /// one. Resolves `NoCandidates` without posting anything when the
    /// candidate set is empty; otherwise records the winning choice as
    /// `next_raid` (persisted on the next selection cycle).
    pub async fn poll_next_raid(
        &self,
        cancel: oneshot::Receiver<()>,
    ) -> Result<PollOutcome, TrainError> {
        let mut raids = self.possible_raids().await?;
        let current = self.current_raid().await;
        if let Some(current) = &current {
            raids.retain(|r| r.id != current.id);
        }
        if raids.is_empty() {
            info!(train_id = self.id, "no candidates for the next-raid vote");
            return Ok(PollOutcome::NoCandidates);
        }

        let board = render_choices(&raids, current.as_deref(), self.deps.travel.as_ref()).await;
        let text = format!("Vote on the next raid from the list below\n\n{}", board.text);
        let message = self
            .deps
            .platform
            .send_message(self.channel_id, &text)
            .await?;
        self.deps
            .platform
            .attach_markers(&message, &board.markers)
            .await?;
        let events = self.deps.platform.subscribe_markers(&message).await?;

        let outcome =
            poll::collect_first(events, &board.markers, self.deps.poll_window, cancel).await;
        if let PollOutcome::Choice(marker) = &outcome {
            match marker_choice(&board.markers, marker, &raids) {
                Some(chosen) => {
                    let mut state = self.state.lock().await;
                    state.next_raid = Some(chosen);
                }
                None => warn!(train_id = self.id, "winning marker not among offered choices"),
            }
        }
        Ok(outcome)
    }

    /// Spawns the next-raid vote as a background task and stores its handle.
    /// Exactly one poll is outstanding per train; a stale unfinished handle
    /// is resolved off to the side rather than discarded.
    async fn spawn_next_poll(self: &Arc<Self>) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let train = Arc::clone(self);
        let task = tokio::spawn(async move {
            match train.poll_next_raid(cancel_rx).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(train_id = train.id, "next-raid vote failed: {err}");
                    PollOutcome::NoSelection
                }
            }
        });
        let handle = PollHandle::new(cancel_tx, task);

        let previous = {
            let mut state = self.state.lock().await;
            state.poll.replace(handle)
        };
        if let Some(previous) = previous {
            if !previous.is_finished() {
                warn!(train_id = self.id, "replacing an unfinished poll");
            }
            tokio::spawn(async move {
                let outcome = previous.resolve().await;
                debug!(?outcome, "stale poll resolved");
            });
        }
    }

    /// Ends the current stop and rolls the train on.
    ///
    /// The outstanding vote is resolved first (cancel-and-await recovers the
    /// best recorded choice). Without a resolved next raid this fails with
    /// [`TrainError::NoNextRaid`] and leaves the train untouched. Otherwise
    /// the current raid's postings in this channel are deleted best-effort,
    /// its listings are trimmed and persisted, and the next raid is promoted
    /// through [`Train::select_raid`].
    pub async fn finish_current_raid(self: &Arc<Self>) -> Result<CleanupReport, TrainError> {
        let (current, outstanding) = {
            let mut state = self.state.lock().await;
            match state.current_raid.clone() {
                Some(raid) => (raid, state.poll.take()),
                None => return Err(TrainError::NoCurrentRaid),
            }
        };

        if let Some(poll) = outstanding {
            let outcome = poll.resolve().await;
            debug!(train_id = self.id, ?outcome, "outstanding poll resolved");
        }

        let next = { self.state.lock().await.next_raid.clone() };
        let Some(next) = next else {
            return Err(TrainError::NoNextRaid);
        };

        current.remove_channel(self.channel_id).await;
        let mut report = CleanupReport::default();
        for message in current.postings_in(self.channel_id).await {
            match self.deps.platform.delete_message(&message).await {
                Ok(()) => report.deleted.push(message),
                Err(err) => {
                    warn!(train_id = self.id, message = %message, "message deletion failed: {err}");
                    report.failed.push((message, err.to_string()));
                }
            }
            current.remove_posting(&message).await;
        }
        current.upsert(&self.deps.pool).await?;
        info!(
            train_id = self.id,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "current raid torn down"
        );

        {
            self.state.lock().await.current_raid = None;
        }
        self.select_raid(next).await?;
        Ok(report)
    }

    /// Announces a freshly reported raid in the train channel with a
    /// vote-next affordance. Travel time is measured from the current raid's
    /// gym when both ends are mapped.
    pub async fn announce_new_raid(&self, raid: &Arc<Raid>) -> Result<(), TrainError> {
        let current = self.current_raid().await;
        let times = travel_lookup(
            current.as_deref(),
            std::slice::from_ref(raid),
            self.deps.travel.as_ref(),
        )
        .await;
        let travel_mins = raid
            .site
            .gym()
            .and_then(|gym| times.get(&gym.id))
            .map(|secs| secs / 60);
        let card = raid.card(travel_mins).await;
        let text = format!("Use the button below to vote for this raid next\n\n{card}");
        let message = self
            .deps
            .platform
            .send_message(self.channel_id, &text)
            .await?;
        self.deps
            .platform
            .attach_markers(&message, &[Marker::from(VOTE_NEXT_MARKER)])
            .await?;
        Ok(())
    }

    /// Directions link for a raid's site.
    pub fn route_url(&self, raid: &Raid) -> String {
        raid.site.route_url()
    }
}

fn marker_choice(
    markers: &[Marker],
    marker: &Marker,
    raids: &[Arc<Raid>],
) -> Option<Arc<Raid>> {
    markers
        .iter()
        .position(|m| m == marker)
        .and_then(|idx| raids.get(idx).cloned())
}
