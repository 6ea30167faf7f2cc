use crate::message::OutgoingMessage;
use crate::types::{Category, ChannelId, MessageId, NewsItem, Result};
use async_trait::async_trait;

/// Source of normalized news for a category.
#[async_trait]
pub trait NewsFeed: Send + Sync {
    /// Newest-first items, at most `limit`. Transport and parse failures are
    /// logged by the implementation and yield an empty list.
    async fn fetch_latest(&self, category: Category, limit: usize) -> Vec<NewsItem>;
}

/// A text channel the bot can post into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: Option<String>,
}

impl Channel {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// Outcome of looking up a configured destination channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelResolution {
    Resolved(Channel),
    /// The channel no longer exists; its configuration is not actionable.
    NotFound,
    /// The bot lost access. Worth retrying on the next tick.
    Forbidden,
    /// Any other failure talking to the platform.
    Transient(String),
}

/// The slice of the chat platform the bot needs.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn resolve_channel(&self, channel: ChannelId) -> ChannelResolution;

    async fn send_message(&self, channel: ChannelId, message: &OutgoingMessage) -> Result<()>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;
}
