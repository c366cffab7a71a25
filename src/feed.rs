use std::sync::Arc;

use tracing::debug;

use crate::store::SocialStore;
use crate::types::{has_more, FeedAuthor, FeedEntry, FeedPage, Result};

/// Personalized activity feed, computed fan-out-on-read: resolve the
/// viewer's following-set, then page through activities authored by that
/// set, newest first with an id tie-break so pagination stays stable.
///
/// Storage failures propagate as `DataAccess`; there is no retry here.
pub struct FeedAggregator {
    store: Arc<dyn SocialStore>,
}

impl FeedAggregator {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    pub async fn feed(&self, viewer_id: i64, limit: i64, offset: i64) -> Result<FeedPage> {
        let following = self.store.following_ids(viewer_id).await?;
        if following.is_empty() {
            debug!("User {} follows nobody, returning empty feed", viewer_id);
            return Ok(FeedPage {
                entries: Vec::new(),
                total: 0,
                has_more: false,
            });
        }

        // Page and total are independent reads over the same filter.
        let (records, total) = tokio::join!(
            self.store.activities_by_authors(&following, limit, offset),
            self.store.count_activities_by_authors(&following),
        );
        let records = records?;
        let total = total?;

        let entries: Vec<FeedEntry> = records
            .into_iter()
            .map(|record| FeedEntry {
                id: record.activity.id,
                kind: record.activity.kind,
                target: record.target,
                metadata: record.activity.metadata,
                created_at: record.activity.created_at,
                author: FeedAuthor::from_display(record.author),
            })
            .collect();

        debug!(
            "Feed for user {}: {} entries of {} total (offset {})",
            viewer_id,
            entries.len(),
            total,
            offset
        );

        Ok(FeedPage {
            has_more: has_more(offset, entries.len(), total),
            entries,
            total,
        })
    }
}
