pub mod client;
pub mod status;

pub use client::{ChannelInfo, FeedPost, UpstreamClient, UpstreamConfig};
pub use status::{ServiceTarget, StatusAggregator};
