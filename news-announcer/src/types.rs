use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

snowflake!(
    /// A server (guild) on the chat platform.
    GuildId
);
snowflake!(ChannelId);
snowflake!(RoleId);
snowflake!(MessageId);

/// The two news categories the bot knows how to announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Windows,
    Linux,
}

impl Category {
    /// Every category, in the order a tick processes them.
    pub const ALL: [Category; 2] = [Category::Windows, Category::Linux];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Windows => "windows",
            Category::Linux => "linux",
        }
    }

    /// Capitalized label used in message footers.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Windows => "Windows",
            Category::Linux => "Linux",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AnnouncerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "windows" => Ok(Category::Windows),
            "linux" => Ok(Category::Linux),
            other => Err(AnnouncerError::UnknownCategory(other.to_string())),
        }
    }
}

/// A normalized news entry produced by a feed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Deduplication key: the feed's guid, falling back to the link.
    pub id: String,
    pub title: String,
    pub link: String,
    /// Markup-free summary, bounded to `MAX_SUMMARY_CHARS` plus a marker.
    pub summary: String,
    pub image_url: Option<String>,
    /// RFC 2822 publication date, empty when the feed has none.
    pub published: String,
    pub category: Category,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-announcer/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 5,
            max_redirects: 5,
        }
    }
}

/// Feed URL for each category.
#[derive(Debug, Clone)]
pub struct FeedUrls {
    pub windows: String,
    pub linux: String,
}

impl FeedUrls {
    pub fn url_for(&self, category: Category) -> &str {
        match category {
            Category::Windows => &self.windows,
            Category::Linux => &self.linux,
        }
    }
}

impl Default for FeedUrls {
    fn default() -> Self {
        Self {
            windows: "https://www.infomoney.com.br/tudo-sobre/windows/feed/".to_string(),
            linux: "https://diolinux.com.br/feed".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    /// Time between two polling ticks.
    pub check_interval: Duration,
    /// Pause after every outbound post, keeps bursts under the platform rate limits.
    pub post_delay: Duration,
    /// How many of the newest items are requested per category and tick.
    pub feed_limit: usize,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(3600),
            post_delay: Duration::from_secs(5),
            feed_limit: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnnouncerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Platform returned {status}: {message}")]
    Platform { status: u16, message: String },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl AnnouncerError {
    /// Persistence failures are the only errors allowed to stop a tick.
    pub fn is_persistence(&self) -> bool {
        matches!(self, AnnouncerError::Persist { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnnouncerError>;
