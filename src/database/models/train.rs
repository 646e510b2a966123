use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted train. Upserted on every state transition; the poll handle
/// is transient and never stored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrainRecord {
    pub id: i64,
    pub guild_id: i64,
    pub channel_id: String,
    pub report_channel_id: String,
    pub current_raid_id: Option<String>,
    pub next_raid_id: Option<String>,
    pub created_at: String,
}

impl TrainRecord {
    pub fn new(
        id: i64,
        guild_id: i64,
        channel_id: String,
        report_channel_id: String,
        current_raid_id: Option<String>,
        next_raid_id: Option<String>,
    ) -> Self {
        Self {
            id,
            guild_id,
            channel_id,
            report_channel_id,
            current_raid_id,
            next_raid_id,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub async fn upsert(&self, pool: &sqlx::SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO trains (id, guild_id, channel_id, report_channel_id, current_raid_id, next_raid_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                current_raid_id = excluded.current_raid_id,
                next_raid_id = excluded.next_raid_id
            "#,
        )
        .bind(self.id)
        .bind(self.guild_id)
        .bind(&self.channel_id)
        .bind(&self.report_channel_id)
        .bind(&self.current_raid_id)
        .bind(&self.next_raid_id)
        .bind(&self.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        train_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TrainRecord>(
            "SELECT id, guild_id, channel_id, report_channel_id, current_raid_id, next_raid_id, created_at FROM trains WHERE id = ?"
        )
        .bind(train_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_channel(
        pool: &sqlx::SqlitePool,
        channel_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TrainRecord>(
            "SELECT id, guild_id, channel_id, report_channel_id, current_raid_id, next_raid_id, created_at FROM trains WHERE channel_id = ?"
        )
        .bind(channel_id)
        .fetch_optional(pool)
        .await
    }
}
