//! Raids as consumed from report channels.
//!
//! A raid is reported elsewhere and displayed by any number of trains at
//! once. Each train appends its own channel and message entries to the
//! raid's listings and removes only what it added; the listings are
//! persisted wholesale per raid.

use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::database::models::RaidRecord;
use crate::platform::{ChannelId, Marker, MessageRef};
use crate::utils::markdown::escape_markdown;

/// Raid lifecycle: an egg hatches into a boss, which is then active until
/// the raid ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaidStatus {
    Egg,
    Hatched,
    Active,
}

impl RaidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaidStatus::Egg => "egg",
            RaidStatus::Hatched => "hatched",
            RaidStatus::Active => "active",
        }
    }
}

impl fmt::Display for RaidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown raid status: {0}")]
pub struct UnknownStatus(String);

impl FromStr for RaidStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "egg" => Ok(RaidStatus::Egg),
            "hatched" => Ok(RaidStatus::Hatched),
            "active" => Ok(RaidStatus::Active),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A mapped gym with coordinates.
#[derive(Debug, Clone)]
pub struct Gym {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub url: Option<String>,
}

/// Where a raid takes place: a known gym, or an ad-hoc location reported
/// with nothing but a name and a link.
#[derive(Debug, Clone)]
pub enum RaidSite {
    Gym(Gym),
    Unplaced { name: String, url: String },
}

impl RaidSite {
    pub fn name(&self) -> &str {
        match self {
            RaidSite::Gym(gym) => &gym.name,
            RaidSite::Unplaced { name, .. } => name,
        }
    }

    pub fn gym(&self) -> Option<&Gym> {
        match self {
            RaidSite::Gym(gym) => Some(gym),
            RaidSite::Unplaced { .. } => None,
        }
    }

    /// Directions link: the gym's stored URL, a mapping-service URL built
    /// from its coordinates, or the raw URL of an unplaced location.
    pub fn route_url(&self) -> String {
        match self {
            RaidSite::Gym(gym) => gym.url.clone().unwrap_or_else(|| {
                format!(
                    "https://www.google.com/maps/dir/?api=1&destination={},{}",
                    gym.lat, gym.lng
                )
            }),
            RaidSite::Unplaced { url, .. } => url.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Listings {
    channel_ids: Vec<ChannelId>,
    message_ids: Vec<MessageRef>,
}

/// An in-memory raid instance. One canonical instance exists per raid id
/// (enforced by the registry); trains share it and mutate its listings.
#[derive(Debug)]
pub struct Raid {
    pub id: String,
    pub guild_id: i64,
    pub boss: Option<String>,
    pub level: i64,
    pub site: RaidSite,
    /// Unix seconds. Hatch time while the raid is an egg, despawn time after.
    pub ends_at: i64,
    status: RwLock<RaidStatus>,
    listings: RwLock<Listings>,
}

impl Raid {
    pub fn new(
        id: String,
        guild_id: i64,
        status: RaidStatus,
        boss: Option<String>,
        level: i64,
        site: RaidSite,
        ends_at: i64,
    ) -> Self {
        Self {
            id,
            guild_id,
            boss,
            level,
            site,
            ends_at,
            status: RwLock::new(status),
            listings: RwLock::new(Listings::default()),
        }
    }

    pub async fn status(&self) -> RaidStatus {
        *self.status.read().await
    }

    /// Status updates arrive from the reporting side (egg hatch, despawn).
    pub async fn set_status(&self, status: RaidStatus) {
        *self.status.write().await = status;
    }

    /// Registers a channel as displaying this raid. Idempotent.
    pub async fn add_channel(&self, channel: ChannelId) {
        let mut listings = self.listings.write().await;
        if !listings.channel_ids.contains(&channel) {
            listings.channel_ids.push(channel);
        }
    }

    pub async fn remove_channel(&self, channel: ChannelId) {
        let mut listings = self.listings.write().await;
        listings.channel_ids.retain(|c| *c != channel);
    }

    pub async fn add_posting(&self, message: MessageRef) {
        let mut listings = self.listings.write().await;
        listings.message_ids.push(message);
    }

    pub async fn remove_posting(&self, message: &MessageRef) {
        let mut listings = self.listings.write().await;
        listings.message_ids.retain(|m| m != message);
    }

    pub async fn channels(&self) -> Vec<ChannelId> {
        self.listings.read().await.channel_ids.clone()
    }

    pub async fn postings(&self) -> Vec<MessageRef> {
        self.listings.read().await.message_ids.clone()
    }

    /// The messages a specific train posted for this raid.
    pub async fn postings_in(&self, channel: ChannelId) -> Vec<MessageRef> {
        self.listings
            .read()
            .await
            .message_ids
            .iter()
            .filter(|m| m.channel == channel)
            .copied()
            .collect()
    }

    /// RSVP markers attached to a selected raid's posting.
    pub fn rsvp_markers() -> Vec<Marker> {
        ["\u{2705}", "\u{2753}", "\u{274c}"]
            .into_iter()
            .map(Marker::from)
            .collect()
    }

    fn boss_label(&self) -> String {
        match &self.boss {
            Some(boss) => escape_markdown(boss),
            None => format!("Tier {}", self.level),
        }
    }

    /// One-line candidate summary for choice boards.
    pub async fn summary(&self) -> String {
        let name = escape_markdown(self.site.name());
        match self.status().await {
            RaidStatus::Egg => format!(
                "Tier {} egg at {}, hatches {}",
                self.level,
                name,
                fmt_clock(self.ends_at)
            ),
            RaidStatus::Hatched => format!("{} at {}, just hatched", self.boss_label(), name),
            RaidStatus::Active => format!(
                "{} at {}, ends {}",
                self.boss_label(),
                name,
                fmt_clock(self.ends_at)
            ),
        }
    }

    /// Full MarkdownV2 card, rendered differently for an unhatched egg than
    /// for a hatched or active raid.
    pub async fn card(&self, travel_mins: Option<i64>) -> String {
        let site_line = match &self.site {
            RaidSite::Gym(gym) => format!(
                "Gym: [{}]({})",
                escape_markdown(&gym.name),
                self.site.route_url()
            ),
            RaidSite::Unplaced { name, url } => format!(
                "Gym: [{} \\(Unknown Gym\\)]({})",
                escape_markdown(name),
                url
            ),
        };
        let travel_line = match travel_mins {
            Some(mins) => format!("Travel Time: {mins} mins"),
            None => "Travel Time: Unknown".to_string(),
        };
        match self.status().await {
            RaidStatus::Egg => format!(
                "*Raid Egg*\nLevel: {}\n{}\n{}\nHatches: {}",
                self.level,
                site_line,
                travel_line,
                fmt_clock(self.ends_at)
            ),
            RaidStatus::Hatched | RaidStatus::Active => format!(
                "*Raid Report*\nBoss: {}\n{}\n{}\nEnds: {}",
                self.boss_label(),
                site_line,
                travel_line,
                fmt_clock(self.ends_at)
            ),
        }
    }

    pub async fn to_record(&self) -> RaidRecord {
        let (gym_id, gym_name, gym_url, lat, lng) = match &self.site {
            RaidSite::Gym(gym) => (
                Some(gym.id),
                gym.name.clone(),
                gym.url.clone(),
                Some(gym.lat),
                Some(gym.lng),
            ),
            RaidSite::Unplaced { name, url } => {
                (None, name.clone(), Some(url.clone()), None, None)
            }
        };
        RaidRecord {
            id: self.id.clone(),
            guild_id: self.guild_id,
            status: self.status().await.as_str().to_string(),
            boss: self.boss.clone(),
            level: self.level,
            gym_id,
            gym_name,
            gym_url,
            lat,
            lng,
            ends_at: self.ends_at,
        }
    }

    /// Persists the raid row and replaces its listings.
    pub async fn upsert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        self.to_record().await.upsert(pool).await?;
        let (channels, postings) = {
            let listings = self.listings.read().await;
            let channels: Vec<String> =
                listings.channel_ids.iter().map(ToString::to_string).collect();
            let postings: Vec<(String, i64)> = listings
                .message_ids
                .iter()
                .map(|m| (m.channel.to_string(), m.message))
                .collect();
            (channels, postings)
        };
        RaidRecord::replace_listings(pool, &self.id, &channels, &postings).await
    }

    /// Loads a raid and its listings. Malformed listing rows are skipped.
    pub async fn load(pool: &SqlitePool, raid_id: &str) -> Result<Option<Self>, sqlx::Error> {
        let Some(record) = RaidRecord::find_by_id(pool, raid_id).await? else {
            return Ok(None);
        };
        let channels = RaidRecord::channels(pool, raid_id).await?;
        let postings = RaidRecord::postings(pool, raid_id).await?;
        Ok(Some(Self::from_record(record, &channels, &postings)))
    }

    fn from_record(record: RaidRecord, channels: &[String], postings: &[(String, i64)]) -> Self {
        let status = record.status.parse().unwrap_or_else(|err| {
            warn!(raid_id = %record.id, "{err}, treating as egg");
            RaidStatus::Egg
        });
        let site = match (record.gym_id, record.lat, record.lng) {
            (Some(id), Some(lat), Some(lng)) => RaidSite::Gym(Gym {
                id,
                name: record.gym_name,
                lat,
                lng,
                url: record.gym_url,
            }),
            _ => RaidSite::Unplaced {
                name: record.gym_name,
                url: record.gym_url.unwrap_or_default(),
            },
        };
        let channel_ids = channels
            .iter()
            .filter_map(|raw| match raw.parse() {
                Ok(channel) => Some(channel),
                Err(_) => {
                    warn!(raid_id = %record.id, entry = %raw, "skipping malformed channel entry");
                    None
                }
            })
            .collect();
        let message_ids = postings
            .iter()
            .filter_map(|(channel, message)| match channel.parse() {
                Ok(channel) => Some(MessageRef { channel, message: *message }),
                Err(_) => {
                    warn!(raid_id = %record.id, entry = %channel, "skipping malformed posting entry");
                    None
                }
            })
            .collect();
        Self {
            id: record.id,
            guild_id: record.guild_id,
            boss: record.boss,
            level: record.level,
            site,
            ends_at: record.ends_at,
            status: RwLock::new(status),
            listings: RwLock::new(Listings { channel_ids, message_ids }),
        }
    }
}

fn fmt_clock(ts: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "??:??".to_string())
}
