use crate::config_store::ConfigStore;
use crate::ledger::SeenLedger;
use crate::traits::{ChatPlatform, NewsFeed};
use crate::types::AnnouncerConfig;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const CONFIG_FILE: &str = "server_config.json";
pub const SENT_NEWS_FILE: &str = "sent_news.json";

/// Process-wide context shared by the scheduler and the command handlers.
///
/// Both stores sit behind their own lock: reads may overlap, writes (and the
/// snapshot written with them) are exclusive.
pub struct BotState {
    pub config: RwLock<ConfigStore>,
    pub ledger: RwLock<SeenLedger>,
    pub feed: Arc<dyn NewsFeed>,
    pub platform: Arc<dyn ChatPlatform>,
    pub settings: AnnouncerConfig,
}

impl BotState {
    pub fn new(
        config: ConfigStore,
        ledger: SeenLedger,
        feed: Arc<dyn NewsFeed>,
        platform: Arc<dyn ChatPlatform>,
        settings: AnnouncerConfig,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            ledger: RwLock::new(ledger),
            feed,
            platform,
            settings,
        }
    }

    /// Load both stores from their usual file names under `state_dir`.
    pub fn load(
        state_dir: &Path,
        feed: Arc<dyn NewsFeed>,
        platform: Arc<dyn ChatPlatform>,
        settings: AnnouncerConfig,
    ) -> Self {
        let config = ConfigStore::load(state_dir.join(CONFIG_FILE));
        let ledger = SeenLedger::load(state_dir.join(SENT_NEWS_FILE));
        Self::new(config, ledger, feed, platform, settings)
    }
}
