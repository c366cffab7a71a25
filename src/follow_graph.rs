use std::sync::Arc;

use tracing::{debug, info};

use crate::store::SocialStore;
use crate::types::{has_more, FollowCounts, FollowListPage, Result, SocialError};

/// Owns the directed follow relation: edge mutations, existence checks,
/// paginated listings and derived counts. The sole writer of follow
/// edges; everything else in the crate only reads them.
pub struct FollowGraph {
    store: Arc<dyn SocialStore>,
}

impl FollowGraph {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Create the edge `follower_id -> following_id`.
    ///
    /// Re-following is a hard conflict: the storage uniqueness constraint
    /// decides, so two racing calls still produce one success and one
    /// `Conflict`. Returned counts are the followed user's follower total
    /// and the follower's following total, freshly counted.
    pub async fn follow(&self, follower_id: i64, following_id: i64) -> Result<FollowCounts> {
        if follower_id == following_id {
            return Err(SocialError::InvalidOperation(
                "users cannot follow themselves".to_string(),
            ));
        }
        self.require_user(follower_id).await?;
        self.require_user(following_id).await?;

        let inserted = self.store.insert_follow_edge(follower_id, following_id).await?;
        if !inserted {
            return Err(SocialError::Conflict {
                follower_id,
                following_id,
            });
        }

        info!("User {} now follows user {}", follower_id, following_id);
        self.mutation_counts(follower_id, following_id).await
    }

    /// Remove the edge `follower_id -> following_id`; `NotFollowing` when
    /// no such edge exists.
    pub async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<FollowCounts> {
        let deleted = self.store.delete_follow_edge(follower_id, following_id).await?;
        if !deleted {
            return Err(SocialError::NotFollowing {
                follower_id,
                following_id,
            });
        }

        info!("User {} unfollowed user {}", follower_id, following_id);
        self.mutation_counts(follower_id, following_id).await
    }

    pub async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        self.store.edge_exists(follower_id, following_id).await
    }

    /// Users following `user_id`, newest first.
    pub async fn followers(&self, user_id: i64, limit: i64, offset: i64) -> Result<FollowListPage> {
        let entries = self.store.list_followers(user_id, limit, offset).await?;
        let total = self.store.follower_count(user_id).await?;
        debug!("Listed {}/{} followers of user {}", entries.len(), total, user_id);
        Ok(FollowListPage {
            has_more: has_more(offset, entries.len(), total),
            entries,
            total,
        })
    }

    /// Users `user_id` follows, newest first.
    pub async fn following(&self, user_id: i64, limit: i64, offset: i64) -> Result<FollowListPage> {
        let entries = self.store.list_following(user_id, limit, offset).await?;
        let total = self.store.following_count(user_id).await?;
        debug!("Listed {}/{} following of user {}", entries.len(), total, user_id);
        Ok(FollowListPage {
            has_more: has_more(offset, entries.len(), total),
            entries,
            total,
        })
    }

    /// Both totals for one user, counted from the edge table.
    pub async fn counts(&self, user_id: i64) -> Result<FollowCounts> {
        let (followers, following) = tokio::join!(
            self.store.follower_count(user_id),
            self.store.following_count(user_id),
        );
        Ok(FollowCounts {
            followers: followers?,
            following: following?,
        })
    }

    async fn require_user(&self, user_id: i64) -> Result<()> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(SocialError::NotFound { user_id })
        }
    }

    /// Post-mutation counts: the followed side's follower total and the
    /// follower side's following total.
    async fn mutation_counts(&self, follower_id: i64, following_id: i64) -> Result<FollowCounts> {
        let (followers, following) = tokio::join!(
            self.store.follower_count(following_id),
            self.store.following_count(follower_id),
        );
        Ok(FollowCounts {
            followers: followers?,
            following: following?,
        })
    }
}
