pub mod feed;
pub mod follow_graph;
pub mod public_feed;
pub mod store;
pub mod types;

pub use feed::FeedAggregator;
pub use follow_graph::FollowGraph;
pub use public_feed::{FallbackPolicy, PublicFeedAggregator, PublicFeedConfig};
pub use store::{MemorySocialStore, PgSocialStore, SocialStore};
pub use types::*;
