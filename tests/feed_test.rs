use std::sync::Arc;

use chrono::{Duration, Utc};
use runhub_social::store::memory::{CommentRecord, EventRecord};
use runhub_social::{
    Activity, ActivityTarget, FeedAggregator, FollowGraph, MemorySocialStore, SocialError,
    TargetType, UserDisplay,
};

fn user(id: i64, name: &str) -> UserDisplay {
    UserDisplay {
        id,
        name: name.to_string(),
        profile_image: None,
        bio: Some(format!("{} runs a lot", name)),
    }
}

fn activity(
    id: i64,
    user_id: i64,
    kind: &str,
    target_type: TargetType,
    target_id: Option<i64>,
    age: Duration,
) -> Activity {
    Activity {
        id,
        user_id,
        kind: kind.to_string(),
        target_type,
        target_id,
        metadata: serde_json::json!({}),
        created_at: Utc::now() - age,
    }
}

async fn seeded_store() -> Arc<MemorySocialStore> {
    let store = Arc::new(MemorySocialStore::new());
    store.add_user(user(1, "Viewer One")).await;
    store.add_user(user(2, "Runner Two")).await;
    store.add_user(user(3, "Runner Three")).await;
    store.add_user(user(4, "Runner Four")).await;
    store
        .add_event(EventRecord {
            id: 10,
            title: "Riverside Park 10K".to_string(),
            starts_at: Utc::now() + Duration::days(14),
            location: Some("Riverside Park".to_string()),
            is_active: true,
        })
        .await;
    store
}

#[tokio::test]
async fn feed_contains_only_followed_authors() {
    let _ = tracing_subscriber::fmt().try_init();
    let store = seeded_store().await;

    // User 1 follows 2 and 3 but not 4. Activities exist for 2 and 4.
    let graph = FollowGraph::new(store.clone());
    graph.follow(1, 2).await.unwrap();
    graph.follow(1, 3).await.unwrap();

    store
        .add_activity(activity(1, 2, "registration", TargetType::Event, Some(10), Duration::hours(1)))
        .await;
    store
        .add_activity(activity(2, 4, "registration", TargetType::Event, Some(10), Duration::minutes(5)))
        .await;

    let page = FeedAggregator::new(store).feed(1, 10, 0).await.unwrap();

    assert_eq!(page.entries.len(), 1, "user 4's activity must be absent");
    assert_eq!(page.total, 1);
    assert!(!page.has_more);

    let entry = &page.entries[0];
    assert_eq!(entry.author.id, 2);
    assert_eq!(entry.kind, "registration");
    match &entry.target {
        ActivityTarget::Event(event) => {
            assert_eq!(event.id, 10);
            assert_eq!(event.title, "Riverside Park 10K");
        }
        other => panic!("expected event target, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_following_set_yields_empty_feed() {
    let _ = tracing_subscriber::fmt().try_init();
    let store = seeded_store().await;
    store
        .add_activity(activity(1, 2, "registration", TargetType::Event, Some(10), Duration::hours(1)))
        .await;

    let page = FeedAggregator::new(store).feed(1, 10, 0).await.unwrap();
    assert!(page.entries.is_empty());
    assert_eq!(page.total, 0);
    assert!(!page.has_more);
}

#[tokio::test]
async fn author_fields_are_display_placeholders() {
    let _ = tracing_subscriber::fmt().try_init();
    let store = seeded_store().await;
    FollowGraph::new(store.clone()).follow(1, 2).await.unwrap();
    store
        .add_activity(activity(1, 2, "registration", TargetType::Event, Some(10), Duration::hours(1)))
        .await;

    let page = FeedAggregator::new(store).feed(1, 10, 0).await.unwrap();
    let author = &page.entries[0].author;
    assert_eq!(author.name, "Runner Two");
    assert_eq!(author.role, "member", "role is a fixed placeholder");
    assert!(!author.verified, "verification status is a fixed placeholder");
    assert!(author.bio.is_some());
}

#[tokio::test]
async fn every_target_variant_resolves() {
    let _ = tracing_subscriber::fmt().try_init();
    let store = seeded_store().await;
    FollowGraph::new(store.clone()).follow(1, 2).await.unwrap();

    store
        .add_comment(CommentRecord {
            id: 50,
            event_id: 10,
            user_id: 3,
            parent_id: None,
            content: "See you at the start line".to_string(),
            created_at: Utc::now() - Duration::hours(5),
        })
        .await;

    store
        .add_activity(activity(1, 2, "registration", TargetType::Event, Some(10), Duration::hours(4)))
        .await;
    store
        .add_activity(activity(2, 2, "follow", TargetType::User, Some(3), Duration::hours(3)))
        .await;
    store
        .add_activity(activity(3, 2, "comment_posted", TargetType::Comment, Some(50), Duration::hours(2)))
        .await;
    store
        .add_activity(activity(4, 2, "profile_updated", TargetType::None, None, Duration::hours(1)))
        .await;

    let page = FeedAggregator::new(store).feed(1, 10, 0).await.unwrap();
    assert_eq!(page.entries.len(), 4);

    // Newest first: none, comment, user, event.
    assert_eq!(page.entries[0].target, ActivityTarget::None);
    match &page.entries[1].target {
        ActivityTarget::Comment(comment) => {
            assert_eq!(comment.id, 50);
            assert_eq!(comment.event_id, 10);
        }
        other => panic!("expected comment target, got {:?}", other),
    }
    match &page.entries[2].target {
        ActivityTarget::User(target) => assert_eq!(target.id, 3),
        other => panic!("expected user target, got {:?}", other),
    }
    match &page.entries[3].target {
        ActivityTarget::Event(event) => assert_eq!(event.id, 10),
        other => panic!("expected event target, got {:?}", other),
    }
}

#[tokio::test]
async fn feed_order_is_deterministic_and_pages_are_stable() {
    let _ = tracing_subscriber::fmt().try_init();
    let store = seeded_store().await;
    FollowGraph::new(store.clone()).follow(1, 2).await.unwrap();

    // Three activities share one exact timestamp, one is newer.
    let base = Utc::now() - Duration::hours(2);
    for id in 1..=3 {
        let mut shared = activity(id, 2, "registration", TargetType::Event, Some(10), Duration::zero());
        shared.created_at = base;
        store.add_activity(shared).await;
    }
    let mut newest = activity(4, 2, "registration", TargetType::Event, Some(10), Duration::zero());
    newest.created_at = base + Duration::hours(1);
    store.add_activity(newest).await;

    let aggregator = FeedAggregator::new(store);

    let page = aggregator.feed(1, 10, 0).await.unwrap();
    let ids: Vec<i64> = page.entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![4, 3, 2, 1], "created_at desc, then id desc among ties");

    // Walking the feed two at a time revisits nothing and misses nothing.
    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let page = aggregator.feed(1, 2, offset).await.unwrap();
        assert_eq!(
            page.has_more,
            offset + (page.entries.len() as i64) < page.total
        );
        let done = !page.has_more;
        offset += page.entries.len() as i64;
        seen.extend(page.entries.into_iter().map(|e| e.id));
        if done {
            break;
        }
    }
    assert_eq!(seen, vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn storage_failure_propagates_from_personalized_feed() {
    let _ = tracing_subscriber::fmt().try_init();
    let store = seeded_store().await;
    FollowGraph::new(store.clone()).follow(1, 2).await.unwrap();

    store.set_offline(true);
    match FeedAggregator::new(store).feed(1, 10, 0).await {
        Err(SocialError::DataAccess(_)) => {}
        other => panic!("expected DataAccess error, got {:?}", other.err()),
    }
}
