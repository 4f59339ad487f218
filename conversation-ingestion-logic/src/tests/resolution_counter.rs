use pretty_assertions::assert_eq;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, IntoActiveModel};
use uuid::Uuid;

use super::{init_db, seed_conversation, ts};
use crate::{
    services::resolution_counter::ResolutionCounter,
    types::{ChannelResolutionCount, Resolution},
};

/// Scenario from the billing contract: project P, date D, channel X with
/// 3 resolved, 2 unresolved, and one in-progress conversation that has a
/// chat room.
#[tokio::test]
async fn database_backed_counter_tallies_one_channel() {
    let db = init_db("counter_one_channel").await;
    let project_uuid = Uuid::new_v4();
    let channel_uuid = Uuid::new_v4();

    for index in 0..3 {
        seed_conversation(
            db.client().as_ref(),
            project_uuid,
            &format!("tel:+{index}"),
            channel_uuid,
            Resolution::Resolved,
            ts("2024-01-05T08:00:00"),
        )
        .await;
    }
    for index in 0..2 {
        seed_conversation(
            db.client().as_ref(),
            project_uuid,
            &format!("tel:+1{index}"),
            channel_uuid,
            Resolution::Unresolved,
            ts("2024-01-05T09:00:00"),
        )
        .await;
    }
    let with_room = seed_conversation(
        db.client().as_ref(),
        project_uuid,
        "tel:+20",
        channel_uuid,
        Resolution::InProgress,
        ts("2024-01-05T10:00:00"),
    )
    .await;
    let mut with_room = with_room.into_active_model();
    with_room.has_chats_room = Set(true);
    with_room.update(db.client().as_ref()).await.unwrap();

    // outside the target date, must not count
    seed_conversation(
        db.client().as_ref(),
        project_uuid,
        "tel:+30",
        channel_uuid,
        Resolution::Resolved,
        ts("2024-01-06T00:00:00"),
    )
    .await;

    let counter = ResolutionCounter::database_backed(db.client());
    let counts = counter
        .all_channels_counts(project_uuid, "2024-01-05".parse().unwrap())
        .await
        .unwrap();

    assert_eq!(
        counts,
        vec![ChannelResolutionCount {
            channel_uuid,
            resolved: 3,
            unresolved: 2,
            has_chats_rooms: 1,
            unclassified: 0,
        }]
    );

    let single = counter
        .channel_counts(project_uuid, channel_uuid, "2024-01-05".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(single, counts[0]);
}

#[tokio::test]
async fn counter_groups_by_channel_and_ignores_null_channels() {
    let db = init_db("counter_groups_channels").await;
    let project_uuid = Uuid::new_v4();
    let channel_a = Uuid::new_v4();
    let channel_b = Uuid::new_v4();

    seed_conversation(
        db.client().as_ref(),
        project_uuid,
        "tel:+1",
        channel_a,
        Resolution::Resolved,
        ts("2024-01-05T08:00:00"),
    )
    .await;
    seed_conversation(
        db.client().as_ref(),
        project_uuid,
        "tel:+2",
        channel_b,
        Resolution::Unclassified,
        ts("2024-01-05T08:00:00"),
    )
    .await;
    // conversation without a channel is excluded from billing
    let orphan = seed_conversation(
        db.client().as_ref(),
        project_uuid,
        "tel:+3",
        Uuid::new_v4(),
        Resolution::Resolved,
        ts("2024-01-05T08:00:00"),
    )
    .await;
    let mut orphan = orphan.into_active_model();
    orphan.channel_uuid = Set(None);
    orphan.update(db.client().as_ref()).await.unwrap();

    let counter = ResolutionCounter::database_backed(db.client());
    let mut counts = counter
        .all_channels_counts(project_uuid, "2024-01-05".parse().unwrap())
        .await
        .unwrap();
    counts.sort_by_key(|count| count.channel_uuid);

    let mut expected = vec![
        ChannelResolutionCount {
            channel_uuid: channel_a,
            resolved: 1,
            ..Default::default()
        },
        ChannelResolutionCount {
            channel_uuid: channel_b,
            unclassified: 1,
            ..Default::default()
        },
    ];
    expected.sort_by_key(|count| count.channel_uuid);
    assert_eq!(counts, expected);
}

#[tokio::test]
async fn counter_for_unknown_channel_is_all_zeros() {
    let db = init_db("counter_unknown_channel").await;
    let channel_uuid = Uuid::new_v4();
    let counter = ResolutionCounter::database_backed(db.client());
    let counts = counter
        .channel_counts(Uuid::new_v4(), channel_uuid, "2024-01-05".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(counts, ChannelResolutionCount::empty(channel_uuid));
}

#[tokio::test]
async fn has_chat_room_resolution_counts_without_the_flag() {
    let db = init_db("counter_has_chat_room_res").await;
    let project_uuid = Uuid::new_v4();
    let channel_uuid = Uuid::new_v4();

    // resolution 4 with has_chats_room = false still counts once
    seed_conversation(
        db.client().as_ref(),
        project_uuid,
        "tel:+1",
        channel_uuid,
        Resolution::HasChatRoom,
        ts("2024-01-05T08:00:00"),
    )
    .await;

    let counter = ResolutionCounter::database_backed(db.client());
    let counts = counter
        .channel_counts(project_uuid, channel_uuid, "2024-01-05".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(counts.has_chats_rooms, 1);
}
