mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// How the watch log treats rewatches and growth. The underlying design
/// leaves both unspecified, so they are injected policy rather than fixed
/// behavior.
#[derive(Debug, Clone, Copy)]
pub struct HistoryPolicy {
    /// Rewatching a video moves it to the front instead of appending a
    /// duplicate entry.
    pub dedupe: bool,
    /// Oldest entries beyond this length are dropped. `None` = unbounded.
    pub max_len: Option<u32>,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            dedupe: true,
            max_len: Some(100),
        }
    }
}

/// Store defines the database interface.
///
/// Toggle and refresh-token methods are the concurrency-sensitive ones:
/// implementations must make toggles a single atomic insert-or-delete and
/// `swap_refresh_token` a compare-and-swap on the stored value.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Identity operations
    fn create_identity(&self, identity: &Identity) -> Result<()>;
    fn get_identity(&self, id: &str) -> Result<Option<Identity>>;
    fn get_identity_by_username(&self, username: &str) -> Result<Option<Identity>>;
    /// Looks up by username or email, whichever matches.
    fn find_identity_by_login(&self, login: &str) -> Result<Option<Identity>>;
    fn update_password(&self, id: &str, password_hash: &str) -> Result<()>;
    /// Updates the mutable account fields. Duplicate email surfaces as
    /// `Conflict`.
    fn update_account(&self, id: &str, full_name: &str, email: &str) -> Result<()>;

    // Refresh-token slot (single active value per identity)
    fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<()>;
    /// Installs `replacement` only if the stored token still equals
    /// `expected`. Returns false when the condition fails, which the caller
    /// surfaces as an authorization failure.
    fn swap_refresh_token(&self, id: &str, expected: &str, replacement: &str) -> Result<bool>;

    // Video operations
    fn create_video(&self, video: &Video) -> Result<()>;
    fn get_video(&self, id: &str) -> Result<Option<Video>>;
    /// Rewrites the mutable video fields, including the published flag.
    fn update_video(&self, video: &Video) -> Result<()>;
    /// Cascades to comments and watch-history rows. Like edges pointing at
    /// the video stay behind and are filtered lazily on read.
    fn delete_video(&self, id: &str) -> Result<()>;
    fn increment_views(&self, id: &str) -> Result<()>;
    fn list_videos_by_owner(&self, owner_id: &str, limit: i64, offset: i64) -> Result<Vec<Video>>;
    fn count_videos_by_owner(&self, owner_id: &str) -> Result<i64>;
    fn sum_views_by_owner(&self, owner_id: &str) -> Result<i64>;

    // Comment operations
    fn create_comment(&self, comment: &Comment) -> Result<()>;
    fn get_comment(&self, id: &str) -> Result<Option<Comment>>;
    fn list_video_comments(
        &self,
        video_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentWithAuthor>>;
    fn count_video_comments(&self, video_id: &str) -> Result<i64>;
    fn update_comment(&self, id: &str, body: &str) -> Result<()>;
    fn delete_comment(&self, id: &str) -> Result<()>;

    // Tweet operations
    fn create_tweet(&self, tweet: &Tweet) -> Result<()>;
    fn get_tweet(&self, id: &str) -> Result<Option<Tweet>>;
    fn update_tweet(&self, id: &str, body: &str) -> Result<()>;
    fn delete_tweet(&self, id: &str) -> Result<()>;
    fn list_tweets_by_owner(&self, owner_id: &str) -> Result<Vec<Tweet>>;

    // Subscription edges
    /// Atomic toggle: inserts the edge if absent, deletes it if present.
    /// Returns true when the identity is subscribed afterwards.
    fn toggle_subscription(&self, channel_id: &str, subscriber_id: &str) -> Result<bool>;
    fn is_subscribed(&self, subscriber_id: &str, channel_id: &str) -> Result<bool>;
    fn count_subscribers(&self, channel_id: &str) -> Result<i64>;
    fn count_subscribed_to(&self, subscriber_id: &str) -> Result<i64>;
    fn list_subscribers(&self, channel_id: &str) -> Result<Vec<IdentitySummary>>;
    fn list_subscribed_channels(&self, subscriber_id: &str) -> Result<Vec<IdentitySummary>>;

    // Like edges
    /// Atomic toggle keyed by (identity, kind, target). Returns true when
    /// the like exists afterwards.
    fn toggle_like(&self, identity_id: &str, kind: LikeTarget, target_id: &str) -> Result<bool>;
    fn has_liked(&self, identity_id: &str, kind: LikeTarget, target_id: &str) -> Result<bool>;
    /// Likes received across every video, comment, and tweet the owner has
    /// published.
    fn count_likes_on_owned_content(&self, owner_id: &str) -> Result<i64>;
    fn list_liked_videos(
        &self,
        identity_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VideoWithOwner>>;
    fn count_liked_videos(&self, identity_id: &str) -> Result<i64>;

    // Watch history (most-recent-first)
    fn record_watch(&self, identity_id: &str, video_id: &str, policy: &HistoryPolicy)
    -> Result<()>;
    fn watch_history(&self, identity_id: &str) -> Result<Vec<VideoWithOwner>>;

    fn close(&self) -> Result<()>;
}
