use crate::traits::NewsFeed;
use crate::types::{Category, FeedUrls, FetchConfig, NewsItem, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{info, warn};

/// The two fixed category feeds, fetched over HTTP.
pub struct CategoryFeed {
    fetcher: Fetcher,
    urls: FeedUrls,
}

impl CategoryFeed {
    pub fn new(fetch_config: FetchConfig, urls: FeedUrls) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            urls,
        })
    }

    pub fn urls(&self) -> &FeedUrls {
        &self.urls
    }

    async fn try_fetch(&self, category: Category, limit: usize) -> Result<Vec<NewsItem>> {
        let url = self.urls.url_for(category);
        info!("Pulling {} feed: {}", category, url);

        let content = self.fetcher.fetch_feed(url).await?;
        FeedParser::parse_items(&content, category, limit)
    }
}

#[async_trait]
impl NewsFeed for CategoryFeed {
    async fn fetch_latest(&self, category: Category, limit: usize) -> Vec<NewsItem> {
        match self.try_fetch(category, limit).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to fetch {} news: {}", category, e);
                Vec::new()
            }
        }
    }
}
