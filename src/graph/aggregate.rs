use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{CommentWithAuthor, IdentitySummary, Tweet, Video, VideoWithOwner};

/// A channel's public face: identity fields plus derived graph facts,
/// computed relative to the viewing identity.
#[derive(Debug, Serialize)]
pub struct ChannelProfile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_subscribers: i64,
}

/// One page of an offset-paginated query. Pages are 1-based.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Read-side views over the social graph. Never mutates storage; every
/// operation is a composition of named store joins.
pub struct GraphAggregator {
    store: Arc<dyn Store>,
}

/// Rejects non-positive page/limit instead of silently clamping, and
/// returns the offset of the first row on the page. The multiplication is
/// checked: these values arrive straight off the query string.
fn page_offset(page: i64, limit: i64) -> Result<i64> {
    if page < 1 {
        return Err(Error::InvalidArgument("page must be >= 1".into()));
    }
    if limit < 1 {
        return Err(Error::InvalidArgument("limit must be >= 1".into()));
    }
    (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| Error::InvalidArgument("page out of range".into()))
}

/// Degrades a failed dashboard sub-query to zero so its siblings still
/// report. Aggregation reads are not transactional to begin with.
fn zero_on_error(label: &str, result: Result<i64>) -> i64 {
    match result {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!("dashboard sub-query '{}' failed: {}", label, e);
            0
        }
    }
}

impl GraphAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn channel_profile(&self, username: &str, viewer_id: &str) -> Result<ChannelProfile> {
        let channel = self
            .store
            .get_identity_by_username(&username.to_lowercase())?
            .ok_or(Error::NotFound)?;

        let subscriber_count = self.store.count_subscribers(&channel.id)?;
        let subscribed_to_count = self.store.count_subscribed_to(&channel.id)?;
        let is_subscribed = self.store.is_subscribed(viewer_id, &channel.id)?;

        Ok(ChannelProfile {
            id: channel.id,
            username: channel.username,
            full_name: channel.full_name,
            avatar_url: channel.avatar_url,
            cover_url: channel.cover_url,
            subscriber_count,
            subscribed_to_count,
            is_subscribed,
        })
    }

    /// The four stats are computed independently; one failing sub-query
    /// degrades to zero rather than aborting the whole response.
    pub fn dashboard_stats(&self, owner_id: &str) -> DashboardStats {
        DashboardStats {
            total_videos: zero_on_error("videos", self.store.count_videos_by_owner(owner_id)),
            total_views: zero_on_error("views", self.store.sum_views_by_owner(owner_id)),
            total_likes: zero_on_error("likes", self.store.count_likes_on_owned_content(owner_id)),
            total_subscribers: zero_on_error(
                "subscribers",
                self.store.count_subscribers(owner_id),
            ),
        }
    }

    pub fn liked_videos(
        &self,
        identity_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<Page<VideoWithOwner>> {
        let offset = page_offset(page, limit)?;
        let items = self.store.list_liked_videos(identity_id, limit, offset)?;
        let total = self.store.count_liked_videos(identity_id)?;

        Ok(Page {
            items,
            page,
            limit,
            total,
        })
    }

    /// Two-hop join: watch log -> video -> owning identity summary,
    /// most-recent-first.
    pub fn watch_history(&self, identity_id: &str) -> Result<Vec<VideoWithOwner>> {
        self.store.watch_history(identity_id)
    }

    pub fn paginated_comments(
        &self,
        video_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<Page<CommentWithAuthor>> {
        let offset = page_offset(page, limit)?;

        if self.store.get_video(video_id)?.is_none() {
            return Err(Error::NotFound);
        }

        let items = self.store.list_video_comments(video_id, limit, offset)?;
        let total = self.store.count_video_comments(video_id)?;

        Ok(Page {
            items,
            page,
            limit,
            total,
        })
    }

    /// The owner's own uploads, published or not, newest first.
    pub fn channel_videos(&self, owner_id: &str, page: i64, limit: i64) -> Result<Page<Video>> {
        let offset = page_offset(page, limit)?;
        let items = self.store.list_videos_by_owner(owner_id, limit, offset)?;
        let total = self.store.count_videos_by_owner(owner_id)?;

        Ok(Page {
            items,
            page,
            limit,
            total,
        })
    }

    pub fn channel_tweets(&self, username: &str) -> Result<Vec<Tweet>> {
        let channel = self
            .store
            .get_identity_by_username(&username.to_lowercase())?
            .ok_or(Error::NotFound)?;
        self.store.list_tweets_by_owner(&channel.id)
    }

    pub fn channel_subscribers(&self, username: &str) -> Result<Vec<IdentitySummary>> {
        let channel = self
            .store
            .get_identity_by_username(&username.to_lowercase())?
            .ok_or(Error::NotFound)?;
        self.store.list_subscribers(&channel.id)
    }

    pub fn subscribed_channels(&self, identity_id: &str) -> Result<Vec<IdentitySummary>> {
        self.store.list_subscribed_channels(identity_id)
    }
}
