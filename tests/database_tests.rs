mod common;

use anyhow::Result;

use common::{gym_site, make_raid, setup_test_db, GUILD};
use raid_train_bot::database::models::{RaidRecord, TrainRecord};
use raid_train_bot::platform::{ChannelId, MessageRef};
use raid_train_bot::raids::{Raid, RaidStatus};
use raid_train_bot::services::candidates::DbCandidateSource;
use raid_train_bot::services::RaidCandidateSource;

#[tokio::test]
async fn train_record_upsert_and_retrieval() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let record = TrainRecord::new(
        101,
        GUILD,
        "-1001000.50".to_string(),
        "-1001000.1".to_string(),
        None,
        None,
    );
    record.upsert(&db.pool).await?;

    let found = TrainRecord::find_by_id(&db.pool, 101)
        .await?
        .expect("train stored");
    assert_eq!(found.guild_id, GUILD);
    assert_eq!(found.channel_id, "-1001000.50");
    assert_eq!(found.current_raid_id, None);

    let by_channel = TrainRecord::find_by_channel(&db.pool, "-1001000.50")
        .await?
        .expect("indexed by channel");
    assert_eq!(by_channel.id, 101);

    assert!(TrainRecord::find_by_id(&db.pool, 999).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn train_record_upsert_updates_raid_pointers() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let mut record = TrainRecord::new(
        102,
        GUILD,
        "-1001000.51".to_string(),
        "-1001000.1".to_string(),
        None,
        None,
    );
    record.upsert(&db.pool).await?;

    record.current_raid_id = Some("r1".to_string());
    record.next_raid_id = Some("r2".to_string());
    record.upsert(&db.pool).await?;

    let found = TrainRecord::find_by_id(&db.pool, 102)
        .await?
        .expect("train stored");
    assert_eq!(found.current_raid_id.as_deref(), Some("r1"));
    assert_eq!(found.next_raid_id.as_deref(), Some("r2"));
    Ok(())
}

#[tokio::test]
async fn raid_round_trips_with_listings() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let raid = make_raid(
        "raid-a",
        RaidStatus::Active,
        Some("Mewtwo"),
        5,
        gym_site(4, "Harbor Light"),
    );
    let channel = ChannelId { chat: GUILD, topic: 50 };
    raid.add_channel(channel).await;
    raid.add_posting(MessageRef { channel, message: 600 }).await;
    raid.upsert(&db.pool).await?;

    let loaded = Raid::load(&db.pool, "raid-a").await?.expect("raid stored");
    assert_eq!(loaded.status().await, RaidStatus::Active);
    assert_eq!(loaded.boss.as_deref(), Some("Mewtwo"));
    assert_eq!(loaded.channels().await, vec![channel]);
    let postings = loaded.postings().await;
    assert_eq!(postings.len(), 1);
    assert_eq!(postings[0].message, 600);

    assert!(Raid::load(&db.pool, "raid-missing").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn raid_upsert_replaces_listings() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let raid = make_raid("raid-b", RaidStatus::Egg, None, 4, gym_site(5, "Mill Pond"));
    let channel = ChannelId { chat: GUILD, topic: 50 };
    raid.add_channel(channel).await;
    raid.add_posting(MessageRef { channel, message: 1 }).await;
    raid.upsert(&db.pool).await?;

    raid.remove_posting(&MessageRef { channel, message: 1 }).await;
    raid.remove_channel(channel).await;
    raid.set_status(RaidStatus::Hatched).await;
    raid.upsert(&db.pool).await?;

    assert!(RaidRecord::channels(&db.pool, "raid-b").await?.is_empty());
    assert!(RaidRecord::postings(&db.pool, "raid-b").await?.is_empty());
    let record = RaidRecord::find_by_id(&db.pool, "raid-b")
        .await?
        .expect("raid stored");
    assert_eq!(record.status, "hatched");
    Ok(())
}

#[tokio::test]
async fn candidate_source_lists_raids_visible_in_a_channel() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let report = ChannelId { chat: GUILD, topic: 1 };
    let elsewhere = ChannelId { chat: GUILD, topic: 2 };

    for (id, channel) in [("raid-x", report), ("raid-y", report), ("raid-z", elsewhere)] {
        let raid = make_raid(id, RaidStatus::Active, Some("Lugia"), 5, gym_site(8, "Pier"));
        raid.add_channel(channel).await;
        raid.upsert(&db.pool).await?;
    }

    let source = DbCandidateSource::new(db.pool.clone());
    let visible = source.list_visible_raid_ids(report).await?;
    assert_eq!(visible, vec!["raid-x".to_string(), "raid-y".to_string()]);

    let empty = ChannelId { chat: GUILD, topic: 99 };
    assert!(source.list_visible_raid_ids(empty).await?.is_empty());
    Ok(())
}
