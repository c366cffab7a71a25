use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{ActivityTarget, Activity, FollowListEntry, Result, UserDisplay};

pub mod memory;
pub mod postgres;

pub use memory::MemorySocialStore;
pub use postgres::PgSocialStore;

/// An activity joined with its author's display fields and its resolved
/// polymorphic target, as produced by a single read pass.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub activity: Activity,
    pub author: UserDisplay,
    pub target: ActivityTarget,
}

/// A row sampled for the public feed. `event_title` is set for
/// registrations, `comment_content` for comments; `sort_id` breaks
/// ordering ties among equal timestamps.
#[derive(Debug, Clone)]
pub struct PublicActivityRow {
    pub kind: String,
    pub author_name: String,
    pub event_title: Option<String>,
    pub comment_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sort_id: i64,
}

/// Storage seam for the follow graph and both feed aggregators. The
/// follow table is keyed by `(follower_id, following_id)` with a
/// constraint forbidding self-edges; activity rows are read-only here.
///
/// Handles are passed into each component explicitly so the aggregators
/// can run against [`MemorySocialStore`] in tests without a database.
#[async_trait]
pub trait SocialStore: Send + Sync {
    async fn user_exists(&self, user_id: i64) -> Result<bool>;

    /// Insert the edge. Returns `false` when the edge already existed
    /// (the uniqueness constraint fired); the caller decides what a
    /// duplicate means.
    async fn insert_follow_edge(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Delete the edge. Returns `false` when there was nothing to delete.
    async fn delete_follow_edge(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    async fn edge_exists(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    async fn follower_count(&self, user_id: i64) -> Result<i64>;

    async fn following_count(&self, user_id: i64) -> Result<i64>;

    /// Users following `user_id`, newest edge first, annotated with
    /// display fields and `followed_at`.
    async fn list_followers(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowListEntry>>;

    /// Users `user_id` follows, newest edge first.
    async fn list_following(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowListEntry>>;

    /// The viewer's full following-set, for feed fan-out-on-read.
    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>>;

    /// One page of activities authored by any of `authors`, ordered
    /// `created_at DESC, id DESC`, each enriched with author display
    /// fields and the resolved target in the same pass.
    async fn activities_by_authors(
        &self,
        authors: &[i64],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityRecord>>;

    /// Total activities matching the same author filter, independent of
    /// paging.
    async fn count_activities_by_authors(&self, authors: &[i64]) -> Result<i64>;

    /// Recent registration activities on active events, newest first,
    /// at most `cap` rows.
    async fn recent_registrations(&self, cap: i64) -> Result<Vec<PublicActivityRow>>;

    /// Recent top-level comments on active events whose content length
    /// exceeds `min_len`, newest first, at most `cap` rows.
    async fn recent_discussion_comments(
        &self,
        cap: i64,
        min_len: i64,
    ) -> Result<Vec<PublicActivityRow>>;
}
