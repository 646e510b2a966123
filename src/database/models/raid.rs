use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted raid. The channel and posting listings live in the
/// `raid_channels` and `raid_postings` side tables and are replaced
/// wholesale on each upsert (last write wins per raid).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RaidRecord {
    pub id: String,
    pub guild_id: i64,
    pub status: String,
    pub boss: Option<String>,
    pub level: i64,
    pub gym_id: Option<i64>,
    pub gym_name: String,
    pub gym_url: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub ends_at: i64,
}

impl RaidRecord {
    pub async fn upsert(&self, pool: &sqlx::SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO raids (id, guild_id, status, boss, level, gym_id, gym_name, gym_url, lat, lng, ends_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                boss = excluded.boss,
                level = excluded.level,
                ends_at = excluded.ends_at
            "#,
        )
        .bind(&self.id)
        .bind(self.guild_id)
        .bind(&self.status)
        .bind(&self.boss)
        .bind(self.level)
        .bind(self.gym_id)
        .bind(&self.gym_name)
        .bind(&self.gym_url)
        .bind(self.lat)
        .bind(self.lng)
        .bind(self.ends_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        raid_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RaidRecord>(
            "SELECT id, guild_id, status, boss, level, gym_id, gym_name, gym_url, lat, lng, ends_at FROM raids WHERE id = ?"
        )
        .bind(raid_id)
        .fetch_optional(pool)
        .await
    }

    /// Channels currently displaying this raid.
    pub async fn channels(
        pool: &sqlx::SqlitePool,
        raid_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT channel_id FROM raid_channels WHERE raid_id = ? ORDER BY channel_id",
        )
        .bind(raid_id)
        .fetch_all(pool)
        .await
    }

    /// `(channel_id, message_id)` pairs for every message rendering this raid.
    pub async fn postings(
        pool: &sqlx::SqlitePool,
        raid_id: &str,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT channel_id, message_id FROM raid_postings WHERE raid_id = ? ORDER BY channel_id, message_id"
        )
        .bind(raid_id)
        .fetch_all(pool)
        .await
    }

    /// Replaces both listing tables for this raid in one transaction.
    pub async fn replace_listings(
        pool: &sqlx::SqlitePool,
        raid_id: &str,
        channels: &[String],
        postings: &[(String, i64)],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM raid_channels WHERE raid_id = ?")
            .bind(raid_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM raid_postings WHERE raid_id = ?")
            .bind(raid_id)
            .execute(&mut *tx)
            .await?;

        for channel_id in channels {
            sqlx::query("INSERT INTO raid_channels (raid_id, channel_id) VALUES (?, ?)")
                .bind(raid_id)
                .bind(channel_id)
                .execute(&mut *tx)
                .await?;
        }
        for (channel_id, message_id) in postings {
            sqlx::query(
                "INSERT INTO raid_postings (raid_id, channel_id, message_id) VALUES (?, ?, ?)",
            )
            .bind(raid_id)
            .bind(channel_id)
            .bind(message_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
