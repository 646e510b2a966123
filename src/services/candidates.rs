use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::platform::ChannelId;

/// Source of the raid ids currently visible in a report channel.
#[async_trait]
pub trait RaidCandidateSource: Send + Sync {
    /// Returns the visible raid ids, or an empty list when the channel has
    /// none. An empty report channel is not an error.
    async fn list_visible_raid_ids(&self, report_channel: ChannelId) -> Result<Vec<String>>;
}

/// Reads visibility from the `raid_channels` listing table: a raid is
/// visible in a channel while its report posting is up there.
pub struct DbCandidateSource {
    pool: SqlitePool,
}

impl DbCandidateSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RaidCandidateSource for DbCandidateSource {
    async fn list_visible_raid_ids(&self, report_channel: ChannelId) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT raid_id FROM raid_channels WHERE channel_id = ? ORDER BY raid_id",
        )
        .bind(report_channel.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
