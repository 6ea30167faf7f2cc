#![allow(dead_code)]

use async_trait::async_trait;
use news_announcer::{
    Announcer, AnnouncerConfig, AnnouncerError, BotState, Category, Channel, ChannelId,
    ChannelResolution, ChatPlatform, MessageId, NewsFeed, NewsItem, OutgoingMessage, Result,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn news(category: Category, id: &str) -> NewsItem {
    NewsItem {
        id: id.to_string(),
        title: format!("Title {}", id),
        link: format!("https://news.test/{}", id),
        summary: format!("Summary of {}", id),
        image_url: None,
        published: "Mon, 15 Jan 2024 12:00:00 +0000".to_string(),
        category,
    }
}

/// Feed serving fixed newest-first lists per category.
#[derive(Default)]
pub struct FakeFeed {
    items: Mutex<HashMap<Category, Vec<NewsItem>>>,
}

impl FakeFeed {
    pub fn set(&self, category: Category, items: Vec<NewsItem>) {
        self.items.lock().unwrap().insert(category, items);
    }
}

#[async_trait]
impl NewsFeed for FakeFeed {
    async fn fetch_latest(&self, category: Category, limit: usize) -> Vec<NewsItem> {
        self.items
            .lock()
            .unwrap()
            .get(&category)
            .map(|items| items.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

/// In-memory platform. Channels resolve unless overridden; every accepted
/// send and delete is recorded.
#[derive(Default)]
pub struct FakePlatform {
    resolutions: Mutex<HashMap<ChannelId, ChannelResolution>>,
    failing: Mutex<HashSet<ChannelId>>,
    sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
    sent_at: Mutex<Vec<Instant>>,
    deleted: Mutex<Vec<(ChannelId, MessageId)>>,
    lookups: Mutex<usize>,
}

impl FakePlatform {
    pub fn set_resolution(&self, channel: ChannelId, resolution: ChannelResolution) {
        self.resolutions.lock().unwrap().insert(channel, resolution);
    }

    /// Make every send to `channel` fail.
    pub fn fail_sends(&self, channel: ChannelId, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(channel);
        } else {
            set.remove(&channel);
        }
    }

    pub fn sent(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m)
            .collect()
    }

    /// Embed titles of the announcements sent to `channel`, in order.
    pub fn announced_titles(&self, channel: ChannelId) -> Vec<String> {
        self.sent_to(channel)
            .into_iter()
            .flat_map(|m| m.embeds.into_iter().map(|e| e.title))
            .collect()
    }

    pub fn texts_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent_to(channel)
            .into_iter()
            .filter(|m| m.embeds.is_empty())
            .map(|m| m.content)
            .collect()
    }

    /// When each accepted send happened, on the tokio clock.
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(ChannelId, MessageId)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn resolve_channel(&self, channel: ChannelId) -> ChannelResolution {
        *self.lookups.lock().unwrap() += 1;
        self.resolutions
            .lock()
            .unwrap()
            .get(&channel)
            .cloned()
            .unwrap_or(ChannelResolution::Resolved(Channel {
                id: channel,
                name: Some(format!("news-{}", channel)),
            }))
    }

    async fn send_message(&self, channel: ChannelId, message: &OutgoingMessage) -> Result<()> {
        if self.failing.lock().unwrap().contains(&channel) {
            return Err(AnnouncerError::Platform {
                status: 500,
                message: "send rejected".to_string(),
            });
        }
        self.sent.lock().unwrap().push((channel, message.clone()));
        self.sent_at.lock().unwrap().push(Instant::now());
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        self.deleted.lock().unwrap().push((channel, message));
        Ok(())
    }
}

pub struct Harness {
    pub feed: Arc<FakeFeed>,
    pub platform: Arc<FakePlatform>,
    pub announcer: Arc<Announcer>,
}

impl Harness {
    /// Fresh state loaded from `dir`, without any delay between posts.
    pub fn load(dir: &Path) -> Self {
        Self::load_with_delay(dir, Duration::ZERO)
    }

    pub fn load_with_delay(dir: &Path, post_delay: Duration) -> Self {
        Self::load_with(
            dir,
            Arc::new(FakeFeed::default()),
            Arc::new(FakePlatform::default()),
            post_delay,
        )
    }

    /// Reload the files in `dir` while keeping the fakes, as after a restart.
    pub fn reload(&self, dir: &Path) -> Self {
        Self::load_with(dir, self.feed.clone(), self.platform.clone(), Duration::ZERO)
    }

    fn load_with(
        dir: &Path,
        feed: Arc<FakeFeed>,
        platform: Arc<FakePlatform>,
        post_delay: Duration,
    ) -> Self {
        let settings = AnnouncerConfig {
            check_interval: Duration::from_millis(10),
            post_delay,
            feed_limit: 3,
        };
        let state = Arc::new(BotState::load(dir, feed.clone(), platform.clone(), settings));
        Self {
            feed,
            platform,
            announcer: Arc::new(Announcer::new(state)),
        }
    }

    pub fn state(&self) -> &Arc<BotState> {
        self.announcer.state()
    }
}
