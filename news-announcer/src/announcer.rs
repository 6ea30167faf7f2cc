//! The polling and deduplication pass.
//!
//! One tick walks a snapshot of every server config, resolves its channel,
//! fetches each enabled category and posts the items the ledger has not seen
//! yet, oldest first. Failures stay inside the server, category or item they
//! happened in; only persistence errors escape a tick.

use crate::message::OutgoingMessage;
use crate::state::BotState;
use crate::traits::{Channel, ChannelResolution};
use crate::types::{Category, ChannelId, GuildId, NewsItem, Result};
use crate::ServerConfig;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub servers_visited: usize,
    pub servers_removed: usize,
    pub servers_skipped: usize,
    pub posted: usize,
    pub already_seen: usize,
    pub send_failures: usize,
}

pub struct Announcer {
    state: Arc<BotState>,
    // held for a whole tick so two ticks never interleave
    tick_guard: Mutex<()>,
}

impl Announcer {
    pub fn new(state: Arc<BotState>) -> Self {
        Self {
            state,
            tick_guard: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    pub async fn run_tick(&self) -> Result<TickReport> {
        let _guard = self.tick_guard.lock().await;
        let mut report = TickReport::default();

        let snapshot = self.state.config.read().await.snapshot();
        info!("Checking news for {} servers", snapshot.len());

        for (guild, config) in snapshot {
            self.announce_server(guild, &config, &mut report).await?;
        }

        info!(
            "Tick finished: {} servers visited, {} removed, {} skipped, {} posted, {} already seen, {} failed sends",
            report.servers_visited,
            report.servers_removed,
            report.servers_skipped,
            report.posted,
            report.already_seen,
            report.send_failures
        );
        Ok(report)
    }

    async fn announce_server(&self, guild: GuildId, config: &ServerConfig, report: &mut TickReport) -> Result<()> {
        let Some(channel_id) = config.channel_id else {
            debug!("Server {} has no channel, skipping", guild);
            return Ok(());
        };
        report.servers_visited += 1;

        let channel = match self.state.platform.resolve_channel(channel_id).await {
            ChannelResolution::Resolved(channel) => channel,
            ChannelResolution::NotFound => {
                warn!("Channel {} of server {} no longer exists, removing config", channel_id, guild);
                self.state.config.write().await.remove_server(guild)?;
                report.servers_removed += 1;
                return Ok(());
            }
            ChannelResolution::Forbidden => {
                warn!("No permission to access channel {} of server {}", channel_id, guild);
                report.servers_skipped += 1;
                return Ok(());
            }
            ChannelResolution::Transient(reason) => {
                warn!("Could not resolve channel {} of server {}: {}", channel_id, guild, reason);
                report.servers_skipped += 1;
                return Ok(());
            }
        };

        for category in config.enabled_categories() {
            self.announce_category(guild, &channel, category, report).await?;
        }
        Ok(())
    }

    async fn announce_category(
        &self,
        guild: GuildId,
        channel: &Channel,
        category: Category,
        report: &mut TickReport,
    ) -> Result<()> {
        let items = self
            .state
            .feed
            .fetch_latest(category, self.state.settings.feed_limit)
            .await;

        if items.is_empty() {
            warn!("No {} news available for server {}", category, guild);
            return Ok(());
        }

        // feeds list newest first, announcements read as a timeline
        for item in items.into_iter().rev() {
            if self.state.ledger.read().await.contains(&item.id) {
                debug!("Already announced {}", item.id);
                report.already_seen += 1;
                continue;
            }

            match self.post_news(guild, channel.id, &item).await {
                Ok(()) => {
                    self.state.ledger.write().await.append(&item.id)?;
                    report.posted += 1;
                    info!("Announced {} item '{}' in server {}", category, item.title, guild);
                }
                Err(e) => {
                    error!("Failed to post {} to channel {}: {}", item.id, channel.id, e);
                    report.send_failures += 1;
                }
            }

            tokio::time::sleep(self.state.settings.post_delay).await;
        }
        Ok(())
    }

    /// Send `item` to `channel` with the server's current mention roles for
    /// its category. Does not consult or update the ledger.
    pub async fn post_news(&self, guild: GuildId, channel: ChannelId, item: &NewsItem) -> Result<()> {
        let roles = self
            .state
            .config
            .read()
            .await
            .get(guild)
            .map(|config| config.roles_for(item.category).to_vec())
            .unwrap_or_default();

        let message = OutgoingMessage::news(item, &roles);
        self.state.platform.send_message(channel, &message).await
    }
}
