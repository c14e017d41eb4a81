use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::LikeTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionToggle {
    Subscribed,
    Unsubscribed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeToggle {
    Liked,
    Unliked,
}

/// Idempotent-to-state edge flips. The store has no native toggle verb, so
/// each flip is an atomic insert-if-absent / delete-if-present handled in a
/// single store transaction; concurrent identical toggles can never create
/// duplicate edges or error on a double delete.
pub struct ToggleEngine {
    store: Arc<dyn Store>,
}

impl ToggleEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn toggle_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<SubscriptionToggle> {
        if subscriber_id == channel_id {
            return Err(Error::InvalidArgument(
                "cannot subscribe to your own channel".into(),
            ));
        }
        if self.store.get_identity(channel_id)?.is_none() {
            return Err(Error::NotFound);
        }

        let subscribed = self.store.toggle_subscription(channel_id, subscriber_id)?;
        Ok(if subscribed {
            SubscriptionToggle::Subscribed
        } else {
            SubscriptionToggle::Unsubscribed
        })
    }

    pub fn toggle_like(
        &self,
        liked_by_id: &str,
        kind: LikeTarget,
        target_id: &str,
    ) -> Result<LikeToggle> {
        let exists = match kind {
            LikeTarget::Video => self.store.get_video(target_id)?.is_some(),
            LikeTarget::Comment => self.store.get_comment(target_id)?.is_some(),
            LikeTarget::Tweet => self.store.get_tweet(target_id)?.is_some(),
        };
        if !exists {
            return Err(Error::NotFound);
        }

        let liked = self.store.toggle_like(liked_by_id, kind, target_id)?;
        Ok(if liked {
            LikeToggle::Liked
        } else {
            LikeToggle::Unliked
        })
    }
}
