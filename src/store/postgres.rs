use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres, Row};
use tracing::{debug, info};

use crate::store::{ActivityRecord, PublicActivityRow, SocialStore};
use crate::types::{
    Activity, ActivityTarget, FollowListEntry, Result, TargetComment, TargetEvent, TargetType,
    TargetUser, UserDisplay,
};

/// sqlx/Postgres implementation of [`SocialStore`]. All access goes
/// through parameterized queries; duplicate-follow detection relies on
/// the `follows` primary key rather than application state.
pub struct PgSocialStore {
    db: Pool<Postgres>,
}

impl PgSocialStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;

        // Schema comes from migrations; run `sqlx migrate run` before
        // first use.

        info!("Connected social store to Postgres");
        Ok(Self { db })
    }

    pub fn from_pool(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.db
    }
}

fn row_to_activity_record(row: &sqlx::postgres::PgRow) -> Result<ActivityRecord> {
    let target_type = TargetType::parse(row.try_get::<String, _>("target_type")?.as_str());

    let event = match row.try_get::<Option<i64>, _>("event_id")? {
        Some(id) => Some(TargetEvent {
            id,
            title: row.try_get("event_title")?,
            starts_at: row.try_get("event_starts_at")?,
            location: row.try_get("event_location")?,
        }),
        None => None,
    };
    let user = match row.try_get::<Option<i64>, _>("tuser_id")? {
        Some(id) => Some(TargetUser {
            id,
            name: row.try_get("tuser_name")?,
            profile_image: row.try_get("tuser_image")?,
        }),
        None => None,
    };
    let comment = match row.try_get::<Option<i64>, _>("comment_id")? {
        Some(id) => Some(TargetComment {
            id,
            content: row.try_get("comment_content")?,
            event_id: row.try_get("comment_event_id")?,
        }),
        None => None,
    };

    Ok(ActivityRecord {
        activity: Activity {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: row.try_get("kind")?,
            target_type,
            target_id: row.try_get("target_id")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        },
        author: UserDisplay {
            id: row.try_get("user_id")?,
            name: row.try_get("author_name")?,
            profile_image: row.try_get("author_image")?,
            bio: row.try_get("author_bio")?,
        },
        target: ActivityTarget::from_parts(target_type, event, user, comment),
    })
}

fn row_to_follow_entry(row: &sqlx::postgres::PgRow) -> Result<FollowListEntry> {
    Ok(FollowListEntry {
        user: UserDisplay {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            profile_image: row.try_get("profile_image")?,
            bio: row.try_get("bio")?,
        },
        followed_at: row.try_get::<DateTime<Utc>, _>("followed_at")?,
    })
}

#[async_trait]
impl SocialStore for PgSocialStore {
    async fn user_exists(&self, user_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn insert_follow_edge(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow_edge(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn edge_exists(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }

    async fn follower_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn following_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn list_followers(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowListEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.profile_image, u.bio, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1
            ORDER BY f.created_at DESC, u.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_follow_entry).collect()
    }

    async fn list_following(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowListEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.profile_image, u.bio, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC, u.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_follow_entry).collect()
    }

    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT following_id FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;
        Ok(ids)
    }

    async fn activities_by_authors(
        &self,
        authors: &[i64],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.user_id, a.kind, a.target_type, a.target_id, a.metadata, a.created_at,
                   u.name AS author_name, u.profile_image AS author_image, u.bio AS author_bio,
                   e.id AS event_id, e.title AS event_title,
                   e.starts_at AS event_starts_at, e.location AS event_location,
                   tu.id AS tuser_id, tu.name AS tuser_name, tu.profile_image AS tuser_image,
                   c.id AS comment_id, c.content AS comment_content, c.event_id AS comment_event_id
            FROM activities a
            JOIN users u ON u.id = a.user_id
            LEFT JOIN events e ON a.target_type = 'event' AND e.id = a.target_id
            LEFT JOIN users tu ON a.target_type = 'user' AND tu.id = a.target_id
            LEFT JOIN comments c ON a.target_type = 'comment' AND c.id = a.target_id
            WHERE a.user_id = ANY($1)
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(authors)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        debug!("Fetched {} activity rows for {} authors", rows.len(), authors.len());
        rows.iter().map(row_to_activity_record).collect()
    }

    async fn count_activities_by_authors(&self, authors: &[i64]) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM activities WHERE user_id = ANY($1)")
                .bind(authors)
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    async fn recent_registrations(&self, cap: i64) -> Result<Vec<PublicActivityRow>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.created_at, u.name AS author_name, e.title AS event_title
            FROM activities a
            JOIN users u ON u.id = a.user_id
            JOIN events e ON e.id = a.target_id
            WHERE a.kind = 'registration' AND a.target_type = 'event' AND e.is_active = true
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $1
            "#,
        )
        .bind(cap)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PublicActivityRow {
                    kind: "registration".to_string(),
                    author_name: row.try_get("author_name")?,
                    event_title: row.try_get("event_title")?,
                    comment_content: None,
                    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                    sort_id: row.try_get("id")?,
                })
            })
            .collect()
    }

    async fn recent_discussion_comments(
        &self,
        cap: i64,
        min_len: i64,
    ) -> Result<Vec<PublicActivityRow>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.content, c.created_at, u.name AS author_name, e.title AS event_title
            FROM comments c
            JOIN users u ON u.id = c.user_id
            JOIN events e ON e.id = c.event_id
            WHERE c.parent_id IS NULL
              AND char_length(c.content) > $2
              AND e.is_active = true
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT $1
            "#,
        )
        .bind(cap)
        .bind(min_len)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PublicActivityRow {
                    kind: "comment".to_string(),
                    author_name: row.try_get("author_name")?,
                    event_title: row.try_get("event_title")?,
                    comment_content: row.try_get("content")?,
                    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                    sort_id: row.try_get("id")?,
                })
            })
            .collect()
    }
}
