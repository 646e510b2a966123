mod common;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

use common::{
    gym_site, make_deps, make_raid, setup_test_db, MockPlatform, StaticTravel, GUILD,
};
use raid_train_bot::database::connection::DatabaseManager;
use raid_train_bot::database::models::TrainRecord;
use raid_train_bot::platform::{ChannelId, ChatPlatform, Marker};
use raid_train_bot::raids::{Raid, RaidSite, RaidStatus};
use raid_train_bot::train::{InstanceCache, PollOutcome, Train, TrainError};

const AUTHOR: i64 = 4242;

struct Rig {
    db: DatabaseManager,
    platform: Arc<MockPlatform>,
    raids: Arc<InstanceCache<String, Raid>>,
    train: Arc<Train>,
    report: ChannelId,
    _temp_dir: TempDir,
}

async fn rig() -> Result<Rig> {
    let (db, temp_dir) = setup_test_db().await?;
    let platform = MockPlatform::new();
    let raids = Arc::new(InstanceCache::new());
    let deps = make_deps(
        &db,
        platform.clone(),
        Arc::new(StaticTravel(300)),
        raids.clone(),
        Duration::from_secs(30),
    );
    let report = ChannelId { chat: GUILD, topic: 1 };
    let channel = ChannelId { chat: GUILD, topic: 50 };
    let train = Arc::new(Train::new(77, GUILD, channel, report, deps));
    train.upsert().await?;
    Ok(Rig {
        db,
        platform,
        raids,
        train,
        report,
        _temp_dir: temp_dir,
    })
}

impl Rig {
    /// Creates a raid, lists it in the report channel, and persists it.
    async fn add_visible_raid(
        &self,
        id: &str,
        status: RaidStatus,
        boss: Option<&str>,
        gym_id: i64,
        gym_name: &str,
    ) -> Result<Arc<Raid>> {
        let raid = self.raids.get_or_create(id.to_string(), || {
            make_raid(id, status, boss, 5, gym_site(gym_id, gym_name))
        });
        raid.add_channel(self.report).await;
        raid.upsert(&self.db.pool).await?;
        Ok(raid)
    }
}

#[tokio::test]
async fn select_raid_sets_current_and_persists() -> Result<()> {
    let rig = rig().await?;
    let r1 = rig
        .add_visible_raid("r1", RaidStatus::Active, Some("Mewtwo"), 1, "North Gate")
        .await?;
    rig.add_visible_raid("r2", RaidStatus::Egg, None, 2, "Old Mill")
        .await?;

    rig.train.select_raid(r1.clone()).await?;

    let current = rig.train.current_raid().await.expect("current raid set");
    assert_eq!(current.id, "r1");
    assert!(rig.train.next_raid().await.is_none());
    assert!(r1.channels().await.contains(&rig.train.channel_id));
    assert_eq!(r1.postings_in(rig.train.channel_id).await.len(), 1);

    let row = TrainRecord::find_by_id(&rig.db.pool, 77)
        .await?
        .expect("train persisted");
    assert_eq!(row.current_raid_id.as_deref(), Some("r1"));
    assert_eq!(row.next_raid_id, None);

    let card = rig.platform.find_sent("Raid Report").expect("card posted");
    assert_eq!(card.markers.len(), 3);
    Ok(())
}

#[tokio::test]
async fn finishing_promotes_the_voted_next_raid() -> Result<()> {
    let rig = rig().await?;
    let r1 = rig
        .add_visible_raid("r1", RaidStatus::Active, Some("Mewtwo"), 1, "North Gate")
        .await?;
    let _r2 = rig
        .add_visible_raid("r2", RaidStatus::Active, Some("Rayquaza"), 2, "South Gate")
        .await?;

    rig.train.select_raid(r1.clone()).await?;
    let card = rig.platform.find_sent("Raid Report").expect("card posted");

    // Vote for the only other candidate in the background poll.
    let prompt = rig.platform.wait_for_sent("Vote on the next raid").await;
    rig.platform
        .deliver_vote(&prompt.message, Marker::from("1️⃣"), 9)
        .await;

    let report = rig.train.finish_current_raid().await?;

    let current = rig.train.current_raid().await.expect("promoted raid");
    assert_eq!(current.id, "r2");
    assert!(!r1.channels().await.contains(&rig.train.channel_id));
    assert!(r1.postings_in(rig.train.channel_id).await.is_empty());
    assert_eq!(report.deleted, vec![card.message]);
    assert!(report.failed.is_empty());
    assert!(rig.platform.deleted_messages().contains(&card.message));

    let row = TrainRecord::find_by_id(&rig.db.pool, 77)
        .await?
        .expect("train persisted");
    assert_eq!(row.current_raid_id.as_deref(), Some("r2"));
    Ok(())
}

#[tokio::test]
async fn finishing_without_a_next_raid_fails_and_preserves_state() -> Result<()> {
    let rig = rig().await?;
    let r1 = rig
        .add_visible_raid("r1", RaidStatus::Active, Some("Mewtwo"), 1, "North Gate")
        .await?;

    // r1 is the only candidate, so the background poll resolves to
    // NoCandidates and next_raid stays unset.
    rig.train.select_raid(r1.clone()).await?;

    let err = rig
        .train
        .finish_current_raid()
        .await
        .expect_err("no next raid");
    assert!(matches!(err, TrainError::NoNextRaid));

    let current = rig.train.current_raid().await.expect("current unchanged");
    assert_eq!(current.id, "r1");
    assert!(r1.channels().await.contains(&rig.train.channel_id));
    assert_eq!(r1.postings_in(rig.train.channel_id).await.len(), 1);
    assert!(rig.platform.deleted_messages().is_empty());
    Ok(())
}

#[tokio::test]
async fn finishing_an_empty_train_fails() -> Result<()> {
    let rig = rig().await?;
    let err = rig
        .train
        .finish_current_raid()
        .await
        .expect_err("nothing to finish");
    assert!(matches!(err, TrainError::NoCurrentRaid));
    Ok(())
}

#[tokio::test]
async fn empty_report_channel_yields_no_candidates() -> Result<()> {
    let rig = rig().await?;

    assert!(rig.train.possible_raids().await?.is_empty());

    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let outcome = rig.train.poll_next_raid(cancel_rx).await?;
    assert_eq!(outcome, PollOutcome::NoCandidates);

    let err = rig
        .train
        .select_first_raid(AUTHOR)
        .await
        .expect_err("nothing to offer");
    assert!(matches!(err, TrainError::NoCandidates));
    Ok(())
}

#[tokio::test]
async fn first_choice_is_restricted_to_the_author() -> Result<()> {
    let rig = rig().await?;
    rig.add_visible_raid("r1", RaidStatus::Active, Some("Mewtwo"), 1, "North Gate")
        .await?;
    rig.add_visible_raid("r2", RaidStatus::Egg, None, 2, "Old Mill")
        .await?;

    let platform = rig.platform.clone();
    tokio::spawn(async move {
        let prompt = platform.wait_for_sent("Select your first raid").await;
        // A bystander votes first; only the author's choice counts.
        platform
            .deliver_vote(&prompt.message, Marker::from("2️⃣"), 999)
            .await;
        platform
            .deliver_vote(&prompt.message, Marker::from("1️⃣"), AUTHOR)
            .await;
    });

    rig.train.select_first_raid(AUTHOR).await?;

    let current = rig.train.current_raid().await.expect("author's pick");
    assert_eq!(current.id, "r1");
    Ok(())
}

#[tokio::test]
async fn cleanup_continues_past_deletion_failures() -> Result<()> {
    let rig = rig().await?;
    let r1 = rig
        .add_visible_raid("r1", RaidStatus::Active, Some("Mewtwo"), 1, "North Gate")
        .await?;
    rig.add_visible_raid("r2", RaidStatus::Active, Some("Rayquaza"), 2, "South Gate")
        .await?;

    rig.train.select_raid(r1.clone()).await?;
    let card = rig.platform.find_sent("Raid Report").expect("card posted");

    // A second posting for the same raid whose deletion will fail.
    let extra = rig
        .platform
        .send_message(rig.train.channel_id, "pinned directions")
        .await?;
    r1.add_posting(extra).await;
    rig.platform.fail_delete(&extra);

    let prompt = rig.platform.wait_for_sent("Vote on the next raid").await;
    rig.platform
        .deliver_vote(&prompt.message, Marker::from("1️⃣"), 9)
        .await;

    let report = rig.train.finish_current_raid().await?;

    assert_eq!(report.deleted, vec![card.message]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, extra);
    // The failed message is still dropped from the raid's listings.
    assert!(r1.postings_in(rig.train.channel_id).await.is_empty());
    assert_eq!(rig.train.current_raid().await.expect("promoted").id, "r2");
    Ok(())
}

#[tokio::test]
async fn announcements_carry_travel_time_and_vote_marker() -> Result<()> {
    let rig = rig().await?;
    let r1 = rig
        .add_visible_raid("r1", RaidStatus::Active, Some("Mewtwo"), 1, "North Gate")
        .await?;
    rig.add_visible_raid("r2", RaidStatus::Active, Some("Rayquaza"), 2, "South Gate")
        .await?;
    rig.train.select_raid(r1).await?;

    let fresh = Arc::new(make_raid(
        "r-new",
        RaidStatus::Egg,
        None,
        4,
        gym_site(7, "Clock Tower"),
    ));
    rig.train.announce_new_raid(&fresh).await?;

    let announcement = rig
        .platform
        .find_sent("vote for this raid next")
        .expect("announcement posted");
    assert_eq!(announcement.markers, vec![Marker::from("⬆️")]);
    assert!(announcement.text.contains("Travel Time: 5 mins"));
    assert!(announcement.text.contains("Clock Tower"));
    Ok(())
}

#[tokio::test]
async fn route_urls_fall_back_to_stored_links() -> Result<()> {
    let rig = rig().await?;

    let mapped = make_raid("m", RaidStatus::Active, Some("Lugia"), 5, gym_site(3, "Pier"));
    assert!(rig.train.route_url(&mapped).contains("google.com/maps"));

    let unplaced = make_raid(
        "u",
        RaidStatus::Egg,
        None,
        4,
        RaidSite::Unplaced {
            name: "Pop-up Spot".to_string(),
            url: "https://example.com/x".to_string(),
        },
    );
    assert_eq!(rig.train.route_url(&unplaced), "https://example.com/x");
    Ok(())
}

#[tokio::test]
async fn selecting_again_replaces_current_and_clears_next() -> Result<()> {
    let rig = rig().await?;
    let r1 = rig
        .add_visible_raid("r1", RaidStatus::Active, Some("Mewtwo"), 1, "North Gate")
        .await?;
    let r2 = rig
        .add_visible_raid("r2", RaidStatus::Active, Some("Rayquaza"), 2, "South Gate")
        .await?;

    rig.train.select_raid(r1).await?;
    rig.train.select_raid(r2).await?;

    let current = rig.train.current_raid().await.expect("latest selection");
    assert_eq!(current.id, "r2");
    assert!(rig.train.next_raid().await.is_none());

    let row = TrainRecord::find_by_id(&rig.db.pool, 77)
        .await?
        .expect("train persisted");
    assert_eq!(row.current_raid_id.as_deref(), Some("r2"));
    Ok(())
}
