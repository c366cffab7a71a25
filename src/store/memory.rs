use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::store::{ActivityRecord, PublicActivityRow, SocialStore};
use crate::types::{
    Activity, ActivityTarget, FollowListEntry, Result, SocialError, TargetComment, TargetEvent,
    TargetType, TargetUser, UserDisplay,
};

/// Event fixture row for the in-memory store.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub is_active: bool,
}

/// Comment fixture row for the in-memory store.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct FollowEdge {
    follower_id: i64,
    following_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<i64, UserDisplay>,
    events: HashMap<i64, EventRecord>,
    comments: HashMap<i64, CommentRecord>,
    activities: Vec<Activity>,
    follows: Vec<FollowEdge>,
}

/// In-memory [`SocialStore`] used by the test suite and embeddable where
/// no database is available. Mirrors the relational semantics: the edge
/// set is keyed by the ordered pair, counts are derived, listings follow
/// the same ordering as the Postgres implementation.
///
/// `set_offline(true)` makes every operation fail with
/// [`SocialError::DataAccess`], to exercise storage-failure paths.
#[derive(Default)]
pub struct MemorySocialStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemorySocialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: UserDisplay) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn add_event(&self, event: EventRecord) {
        self.tables.write().await.events.insert(event.id, event);
    }

    pub async fn add_comment(&self, comment: CommentRecord) {
        self.tables.write().await.comments.insert(comment.id, comment);
    }

    pub async fn add_activity(&self, activity: Activity) {
        self.tables.write().await.activities.push(activity);
    }

    /// Toggle simulated storage failure for every subsequent call.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SocialError::DataAccess("storage offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn resolve_target(tables: &Tables, activity: &Activity) -> ActivityTarget {
        let event = activity.target_id.and_then(|id| {
            tables.events.get(&id).map(|e| TargetEvent {
                id: e.id,
                title: e.title.clone(),
                starts_at: e.starts_at,
                location: e.location.clone(),
            })
        });
        let user = activity.target_id.and_then(|id| {
            tables.users.get(&id).map(|u| TargetUser {
                id: u.id,
                name: u.name.clone(),
                profile_image: u.profile_image.clone(),
            })
        });
        let comment = activity.target_id.and_then(|id| {
            tables.comments.get(&id).map(|c| TargetComment {
                id: c.id,
                content: c.content.clone(),
                event_id: c.event_id,
            })
        });
        ActivityTarget::from_parts(activity.target_type, event, user, comment)
    }
}

#[async_trait]
impl SocialStore for MemorySocialStore {
    async fn user_exists(&self, user_id: i64) -> Result<bool> {
        self.check_online()?;
        Ok(self.tables.read().await.users.contains_key(&user_id))
    }

    async fn insert_follow_edge(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let exists = tables
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id);
        if exists {
            return Ok(false);
        }
        tables.follows.push(FollowEdge {
            follower_id,
            following_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn delete_follow_edge(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(tables.follows.len() < before)
    }

    async fn edge_exists(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        self.check_online()?;
        Ok(self
            .tables
            .read()
            .await
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id))
    }

    async fn follower_count(&self, user_id: i64) -> Result<i64> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|f| f.following_id == user_id).count() as i64)
    }

    async fn following_count(&self, user_id: i64) -> Result<i64> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables.follows.iter().filter(|f| f.follower_id == user_id).count() as i64)
    }

    async fn list_followers(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowListEntry>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut edges: Vec<&FollowEdge> = tables
            .follows
            .iter()
            .filter(|f| f.following_id == user_id)
            .collect();
        edges.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.follower_id.cmp(&a.follower_id))
        });

        let entries = edges
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|f| {
                tables.users.get(&f.follower_id).map(|u| FollowListEntry {
                    user: u.clone(),
                    followed_at: f.created_at,
                })
            })
            .collect();
        Ok(entries)
    }

    async fn list_following(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowListEntry>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut edges: Vec<&FollowEdge> = tables
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .collect();
        edges.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.following_id.cmp(&a.following_id))
        });

        let entries = edges
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|f| {
                tables.users.get(&f.following_id).map(|u| FollowListEntry {
                    user: u.clone(),
                    followed_at: f.created_at,
                })
            })
            .collect();
        Ok(entries)
    }

    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id)
            .collect())
    }

    async fn activities_by_authors(
        &self,
        authors: &[i64],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityRecord>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut matched: Vec<&Activity> = tables
            .activities
            .iter()
            .filter(|a| authors.contains(&a.user_id))
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let records = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|activity| {
                tables.users.get(&activity.user_id).map(|author| ActivityRecord {
                    activity: activity.clone(),
                    author: author.clone(),
                    target: Self::resolve_target(&tables, activity),
                })
            })
            .collect();
        Ok(records)
    }

    async fn count_activities_by_authors(&self, authors: &[i64]) -> Result<i64> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .activities
            .iter()
            .filter(|a| authors.contains(&a.user_id))
            .count() as i64)
    }

    async fn recent_registrations(&self, cap: i64) -> Result<Vec<PublicActivityRow>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut matched: Vec<&Activity> = tables
            .activities
            .iter()
            .filter(|a| a.kind == "registration" && a.target_type == TargetType::Event)
            .filter(|a| {
                a.target_id
                    .and_then(|id| tables.events.get(&id))
                    .map(|e| e.is_active)
                    .unwrap_or(false)
            })
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let rows = matched
            .into_iter()
            .take(cap.max(0) as usize)
            .filter_map(|a| {
                let author = tables.users.get(&a.user_id)?;
                let event = a.target_id.and_then(|id| tables.events.get(&id))?;
                Some(PublicActivityRow {
                    kind: "registration".to_string(),
                    author_name: author.name.clone(),
                    event_title: Some(event.title.clone()),
                    comment_content: None,
                    created_at: a.created_at,
                    sort_id: a.id,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn recent_discussion_comments(
        &self,
        cap: i64,
        min_len: i64,
    ) -> Result<Vec<PublicActivityRow>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut matched: Vec<&CommentRecord> = tables
            .comments
            .values()
            .filter(|c| c.parent_id.is_none() && c.content.chars().count() as i64 > min_len)
            .filter(|c| {
                tables
                    .events
                    .get(&c.event_id)
                    .map(|e| e.is_active)
                    .unwrap_or(false)
            })
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let rows = matched
            .into_iter()
            .take(cap.max(0) as usize)
            .filter_map(|c| {
                let author = tables.users.get(&c.user_id)?;
                let event = tables.events.get(&c.event_id)?;
                Some(PublicActivityRow {
                    kind: "comment".to_string(),
                    author_name: author.name.clone(),
                    event_title: Some(event.title.clone()),
                    comment_content: Some(c.content.clone()),
                    created_at: c.created_at,
                    sort_id: c.id,
                })
            })
            .collect();
        Ok(rows)
    }
}
