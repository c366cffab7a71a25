use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::store::{PublicActivityRow, SocialStore};
use crate::types::{PublicFeedEntry, Result, SocialError};

/// Avatar colors assigned to anonymized authors. Same initials always
/// hash to the same entry.
const AVATAR_PALETTE: [&str; 8] = [
    "#e5734f", "#4f9de5", "#53b87a", "#c05ce0", "#e0b34e", "#5ccfd4", "#e55c7f", "#8a7fe0",
];

/// How long a comment excerpt may get before it is cut at a word break.
const EXCERPT_MAX_LEN: usize = 140;

/// What to do when the public feed cannot reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Serve the fixed canned feed so the page always renders. Hides
    /// outages from end users; operators get a `warn!`.
    CannedFeed,
    /// Surface the `DataAccess` error to the caller.
    Propagate,
}

#[derive(Debug, Clone)]
pub struct PublicFeedConfig {
    /// Top-level comments shorter than this are not substantial enough
    /// for the public feed.
    pub min_comment_len: i64,
    pub fallback: FallbackPolicy,
}

impl Default for PublicFeedConfig {
    fn default() -> Self {
        Self {
            min_comment_len: 100,
            fallback: FallbackPolicy::CannedFeed,
        }
    }
}

/// Anonymized feed for anonymous visitors. Samples recent registrations
/// and substantial top-level comments across active events, merges them
/// newest-first, and strips author identity down to first name plus
/// initials. Never consults the follow graph.
pub struct PublicFeedAggregator {
    store: Arc<dyn SocialStore>,
    config: PublicFeedConfig,
}

impl PublicFeedAggregator {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self::with_config(store, PublicFeedConfig::default())
    }

    pub fn with_config(store: Arc<dyn SocialStore>, config: PublicFeedConfig) -> Self {
        Self { store, config }
    }

    pub async fn public_feed(&self, limit: i64) -> Result<Vec<PublicFeedEntry>> {
        match self.fetch_and_shape(limit).await {
            Ok(entries) => Ok(entries),
            Err(err @ SocialError::DataAccess(_)) => match self.config.fallback {
                FallbackPolicy::CannedFeed => {
                    warn!("Public feed falling back to canned entries: {}", err);
                    Ok(fallback_feed())
                }
                FallbackPolicy::Propagate => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn fetch_and_shape(&self, limit: i64) -> Result<Vec<PublicFeedEntry>> {
        // 70/30 split between registrations and discussion, rounded up.
        let registration_cap = ceil_share(limit, 7);
        let comment_cap = ceil_share(limit, 3);

        let (registrations, comments) = tokio::join!(
            self.store.recent_registrations(registration_cap),
            self.store
                .recent_discussion_comments(comment_cap, self.config.min_comment_len),
        );

        let mut rows: Vec<PublicActivityRow> = registrations?;
        rows.extend(comments?);
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.sort_id.cmp(&a.sort_id))
        });
        rows.truncate(limit.max(0) as usize);

        let now = Utc::now();
        let entries: Vec<PublicFeedEntry> = rows
            .into_iter()
            .map(|row| PublicFeedEntry {
                display_name: anonymize_name(&row.author_name),
                avatar_color: avatar_color(&initials(&row.author_name)).to_string(),
                kind: row.kind,
                event_title: row.event_title,
                excerpt: row.comment_content.as_deref().map(excerpt),
                time_label: relative_label(row.created_at, now),
            })
            .collect();

        debug!("Public feed produced {} entries (limit {})", entries.len(), limit);
        Ok(entries)
    }
}

/// `ceil(limit * tenths / 10)` without going through floats.
fn ceil_share(limit: i64, tenths: i64) -> i64 {
    (limit.max(0) * tenths + 9) / 10
}

/// Keep the first name whole, reduce every later name part to its
/// initial plus a period: `"Jane Q. Public"` becomes `"Jane Q. P."`.
pub fn anonymize_name(name: &str) -> String {
    let mut parts = name.split_whitespace();
    let Some(first) = parts.next() else {
        return String::new();
    };

    let mut out = first.to_string();
    for part in parts {
        if let Some(initial) = part.chars().next() {
            out.push(' ');
            out.push(initial);
            out.push('.');
        }
    }
    out
}

/// First letter of every name part, uppercased.
fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Deterministic palette pick: same initials, same color.
fn avatar_color(initials: &str) -> &'static str {
    let hash: u64 = initials
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    AVATAR_PALETTE[(hash % AVATAR_PALETTE.len() as u64) as usize]
}

/// Coarse relative time, surfaced verbatim to users: under an hour is
/// "Just now", under a day counts hours, everything else counts days.
pub fn relative_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at).max(Duration::zero());

    if elapsed < Duration::hours(1) {
        "Just now".to_string()
    } else if elapsed < Duration::hours(24) {
        let hours = elapsed.num_hours();
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = elapsed.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}

/// Cut comment content at a word boundary for display.
fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_MAX_LEN {
        return content.to_string();
    }

    let cut: String = content.chars().take(EXCERPT_MAX_LEN).collect();
    match cut.rfind(' ') {
        Some(space) => format!("{}...", &cut[..space]),
        None => format!("{}...", cut),
    }
}

/// Fixed feed served when storage is unreachable and the policy is
/// `CannedFeed`, so the public page always has something to render.
fn fallback_feed() -> Vec<PublicFeedEntry> {
    let canned = [
        ("Sarah K.", "registration", Some("Riverside Park 10K"), None, "Just now"),
        ("Marcus T.", "registration", Some("City Half Marathon"), None, "2 hours ago"),
        (
            "Elena R.",
            "comment",
            Some("Sunset Trail Run"),
            Some("Great course and an even better crowd, already looking forward to next year."),
            "1 day ago",
        ),
    ];

    canned
        .into_iter()
        .map(|(name, kind, event, comment, label)| PublicFeedEntry {
            display_name: name.to_string(),
            avatar_color: avatar_color(&initials(name)).to_string(),
            kind: kind.to_string(),
            event_title: event.map(str::to_string),
            excerpt: comment.map(str::to_string),
            time_label: label.to_string(),
        })
        .collect()
}
