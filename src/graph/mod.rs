mod aggregate;
mod toggle;

pub use aggregate::{ChannelProfile, DashboardStats, GraphAggregator, Page};
pub use toggle::{LikeToggle, SubscriptionToggle, ToggleEngine};
