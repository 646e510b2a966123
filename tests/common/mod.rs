//! Shared fixtures: a temp-file SQLite database, an in-process chat
//! platform, and canned travel services.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;

use raid_train_bot::database::connection::DatabaseManager;
use raid_train_bot::platform::hub::MarkerHub;
use raid_train_bot::platform::{
    ChannelId, ChatPlatform, Marker, MarkerEvent, MessageRef, PlatformError,
};
use raid_train_bot::raids::{Gym, Raid, RaidSite, RaidStatus};
use raid_train_bot::services::candidates::DbCandidateSource;
use raid_train_bot::services::travel::{TravelError, TravelEstimate, TravelTimeService};
use raid_train_bot::train::{InstanceCache, TrainDeps};

pub async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: MessageRef,
    pub text: String,
    pub markers: Vec<Marker>,
}

/// In-process [`ChatPlatform`]: records every send, routes votes through a
/// real [`MarkerHub`], and can be scripted to fail deletions.
pub struct MockPlatform {
    hub: MarkerHub,
    next_message: AtomicI64,
    next_topic: AtomicI64,
    sent: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<MessageRef>>,
    fail_deletes: Mutex<HashSet<String>>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hub: MarkerHub::new(),
            next_message: AtomicI64::new(1),
            next_topic: AtomicI64::new(100),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fail_deletes: Mutex::new(HashSet::new()),
        })
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted_messages(&self) -> Vec<MessageRef> {
        self.deleted.lock().unwrap().clone()
    }

    /// The most recent message whose text contains `needle`.
    pub fn find_sent(&self, needle: &str) -> Option<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.text.contains(needle))
            .cloned()
    }

    /// Make future deletions of `message` fail.
    pub fn fail_delete(&self, message: &MessageRef) {
        self.fail_deletes
            .lock()
            .unwrap()
            .insert(message.id_string());
    }

    /// Delivers a vote once a subscriber for `message` exists. Polls are
    /// opened by background tasks, so the subscription can lag the send.
    pub async fn deliver_vote(&self, message: &MessageRef, marker: Marker, user_id: i64) {
        for _ in 0..500 {
            let event = MarkerEvent {
                marker: marker.clone(),
                user_id,
            };
            if self.hub.dispatch(message, event) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no subscriber appeared for {message}");
    }

    /// Waits until a message containing `needle` has been sent.
    pub async fn wait_for_sent(&self, needle: &str) -> SentMessage {
        for _ in 0..500 {
            if let Some(found) = self.find_sent(needle) {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no message containing {needle:?} was sent");
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn create_channel(
        &self,
        guild_id: i64,
        _name: &str,
    ) -> Result<ChannelId, PlatformError> {
        Ok(ChannelId {
            chat: guild_id,
            topic: self.next_topic.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageRef, PlatformError> {
        let message = MessageRef {
            channel,
            message: self.next_message.fetch_add(1, Ordering::SeqCst),
        };
        self.sent.lock().unwrap().push(SentMessage {
            message,
            text: text.to_string(),
            markers: Vec::new(),
        });
        Ok(message)
    }

    async fn attach_markers(
        &self,
        message: &MessageRef,
        markers: &[Marker],
    ) -> Result<(), PlatformError> {
        let mut sent = self.sent.lock().unwrap();
        if let Some(entry) = sent.iter_mut().find(|m| m.message == *message) {
            entry.markers = markers.to_vec();
        }
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), PlatformError> {
        if self.fail_deletes.lock().unwrap().contains(&message.id_string()) {
            return Err(PlatformError::Api("message can't be deleted".to_string()));
        }
        self.deleted.lock().unwrap().push(*message);
        Ok(())
    }

    async fn subscribe_markers(
        &self,
        message: &MessageRef,
    ) -> Result<mpsc::Receiver<MarkerEvent>, PlatformError> {
        Ok(self.hub.subscribe(message))
    }
}

/// Travel service returning the same duration for every pair.
pub struct StaticTravel(pub i64);

#[async_trait]
impl TravelTimeService for StaticTravel {
    async fn travel_times(
        &self,
        origins: &[Gym],
        destinations: &[Gym],
    ) -> Result<Vec<TravelEstimate>, TravelError> {
        let mut estimates = Vec::new();
        for origin in origins {
            for dest in destinations {
                estimates.push(TravelEstimate {
                    origin_id: origin.id,
                    dest_id: dest.id,
                    travel_time_secs: self.0,
                });
            }
        }
        Ok(estimates)
    }
}

/// Travel service that always fails, for degradation tests.
pub struct FailingTravel;

#[async_trait]
impl TravelTimeService for FailingTravel {
    async fn travel_times(
        &self,
        _origins: &[Gym],
        _destinations: &[Gym],
    ) -> Result<Vec<TravelEstimate>, TravelError> {
        Err(TravelError::Lookup("routing backend offline".to_string()))
    }
}

pub const GUILD: i64 = -1001000;

pub fn gym_site(id: i64, name: &str) -> RaidSite {
    RaidSite::Gym(Gym {
        id,
        name: name.to_string(),
        lat: 47.6 + id as f64 * 0.01,
        lng: -122.3,
        url: None,
    })
}

pub fn make_raid(id: &str, status: RaidStatus, boss: Option<&str>, level: i64, site: RaidSite) -> Raid {
    Raid::new(
        id.to_string(),
        GUILD,
        status,
        boss.map(str::to_string),
        level,
        site,
        1_700_000_000,
    )
}

/// Builds the dependency bundle trains run on, wired to the mock platform
/// and the real sqlite-backed candidate source.
pub fn make_deps(
    db: &DatabaseManager,
    platform: Arc<MockPlatform>,
    travel: Arc<dyn TravelTimeService>,
    raids: Arc<InstanceCache<String, Raid>>,
    poll_window: Duration,
) -> TrainDeps {
    TrainDeps {
        pool: db.pool.clone(),
        platform,
        travel,
        candidates: Arc::new(DbCandidateSource::new(db.pool.clone())),
        raids,
        poll_window,
        prompt_timeout: Duration::from_secs(5),
    }
}
