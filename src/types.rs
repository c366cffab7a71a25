use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal display fields for a user, embedded wherever a feed or follow
/// list needs to show who did something. Not authoritative profile data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDisplay {
    pub id: i64,
    pub name: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
}

/// Follower/following totals for a user. Always counted from the edge
/// table at read time, never maintained as a separate counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

/// One row of a followers/following listing: the related user plus when
/// the edge was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowListEntry {
    pub user: UserDisplay,
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowListPage {
    pub entries: Vec<FollowListEntry>,
    pub total: i64,
    pub has_more: bool,
}

/// What kind of entity an activity points at. The activity `kind` itself
/// stays an open string; this tag only selects how `target_id` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Event,
    User,
    Comment,
    None,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Event => "event",
            TargetType::User => "user",
            TargetType::Comment => "comment",
            TargetType::None => "none",
        }
    }

    /// Unknown tags degrade to `None` rather than failing the whole feed;
    /// producers may add new target types before this crate learns them.
    pub fn parse(s: &str) -> Self {
        match s {
            "event" => TargetType::Event,
            "user" => TargetType::User,
            "comment" => TargetType::Comment,
            _ => TargetType::None,
        }
    }
}

/// An append-only activity row as read from storage. This crate never
/// writes these; the event/registration/comment subsystems produce them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub target_type: TargetType,
    pub target_id: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEvent {
    pub id: i64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetUser {
    pub id: i64,
    pub name: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetComment {
    pub id: i64,
    pub content: String,
    pub event_id: i64,
}

/// The resolved polymorphic target of an activity. Exactly one variant (or
/// `None`) per activity; reconstruction from join columns happens only in
/// [`ActivityTarget::from_parts`] so the invariant has a single owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityTarget {
    Event(TargetEvent),
    User(TargetUser),
    Comment(TargetComment),
    None,
}

impl ActivityTarget {
    /// Rebuild the tagged union from whichever optional join produced a
    /// row. A tag whose join came back empty resolves to `None` (the
    /// target row may have been deleted after the activity was appended).
    pub fn from_parts(
        target_type: TargetType,
        event: Option<TargetEvent>,
        user: Option<TargetUser>,
        comment: Option<TargetComment>,
    ) -> Self {
        match target_type {
            TargetType::Event => event.map(ActivityTarget::Event).unwrap_or(ActivityTarget::None),
            TargetType::User => user.map(ActivityTarget::User).unwrap_or(ActivityTarget::None),
            TargetType::Comment => {
                comment.map(ActivityTarget::Comment).unwrap_or(ActivityTarget::None)
            }
            TargetType::None => ActivityTarget::None,
        }
    }
}

/// Author block embedded in each feed entry. `role` and `verified` are
/// fixed placeholders: the feed is a display denormalization, not a source
/// of truth about the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedAuthor {
    pub id: i64,
    pub name: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub role: String,
    pub verified: bool,
}

impl FeedAuthor {
    pub const PLACEHOLDER_ROLE: &'static str = "member";

    pub fn from_display(user: UserDisplay) -> Self {
        Self {
            id: user.id,
            name: user.name,
            profile_image: user.profile_image,
            bio: user.bio,
            role: Self::PLACEHOLDER_ROLE.to_string(),
            verified: false,
        }
    }
}

/// A single personalized-feed entry: an activity enriched with its
/// resolved target and author display fields. Built fresh per request,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: i64,
    pub kind: String,
    pub target: ActivityTarget,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub author: FeedAuthor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    pub total: i64,
    pub has_more: bool,
}

/// An anonymized public-feed entry. Author identity is reduced to first
/// name plus initials and a palette color; timestamps become coarse
/// relative labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicFeedEntry {
    pub display_name: String,
    pub avatar_color: String,
    pub kind: String,
    pub event_title: Option<String>,
    pub excerpt: Option<String>,
    pub time_label: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("user {user_id} not found")]
    NotFound { user_id: i64 },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("user {follower_id} already follows user {following_id}")]
    Conflict { follower_id: i64, following_id: i64 },

    #[error("user {follower_id} is not following user {following_id}")]
    NotFollowing { follower_id: i64, following_id: i64 },

    #[error("data access error: {0}")]
    DataAccess(String),
}

impl From<sqlx::Error> for SocialError {
    fn from(err: sqlx::Error) -> Self {
        SocialError::DataAccess(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SocialError>;

/// Pagination rule shared by every listing this crate returns.
pub fn has_more(offset: i64, returned: usize, total: i64) -> bool {
    offset + (returned as i64) < total
}
