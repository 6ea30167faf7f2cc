use anyhow::Context;
use clap::{Parser, Subcommand};
use news_announcer::{
    Announcer, AnnouncerConfig, BotState, CategoryFeed, ChannelId, CommandContext, CommandHandler,
    DiscordClient, FeedUrls, FetchConfig, GuildId, IntervalTicker, Permissions, Scheduler,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "news-announcer")]
#[command(about = "Announces Windows and Linux news in chat servers")]
#[command(version)]
struct Cli {
    /// Bot token for the chat platform
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between two news checks
    #[arg(
        long,
        env = "CHECK_INTERVAL",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    check_interval: u64,

    /// Seconds to wait after every post
    #[arg(long, env = "POST_DELAY", default_value_t = 5)]
    post_delay: u64,

    /// Newest items requested per category and check
    #[arg(long, env = "FEED_LIMIT", default_value_t = 3)]
    feed_limit: usize,

    /// Directory holding server_config.json and sent_news.json
    #[arg(long, env = "STATE_DIR", default_value = ".")]
    state_dir: PathBuf,

    #[arg(long, env = "WINDOWS_FEED_URL")]
    windows_feed_url: Option<String>,

    #[arg(long, env = "LINUX_FEED_URL")]
    linux_feed_url: Option<String>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Poll the feeds and announce new items (default)
    Run,

    /// Run a single chat command as a server administrator
    Exec {
        #[arg(long)]
        guild: u64,

        #[arg(long)]
        channel: u64,

        /// Command text, e.g. `!setrole linux <@&123>`
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
}

impl Cli {
    fn feed_urls(&self) -> FeedUrls {
        let defaults = FeedUrls::default();
        FeedUrls {
            windows: self.windows_feed_url.clone().unwrap_or(defaults.windows),
            linux: self.linux_feed_url.clone().unwrap_or(defaults.linux),
        }
    }

    fn settings(&self) -> AnnouncerConfig {
        AnnouncerConfig {
            check_interval: Duration::from_secs(self.check_interval),
            post_delay: Duration::from_secs(self.post_delay),
            feed_limit: self.feed_limit,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let Some(token) = cli.token.clone().filter(|t| !t.trim().is_empty()) else {
        error!("DISCORD_TOKEN is not set, refusing to start");
        anyhow::bail!("missing DISCORD_TOKEN");
    };

    let fetch_config = FetchConfig::default();
    let platform = Arc::new(
        DiscordClient::new(token, &fetch_config).context("failed to build the platform client")?,
    );
    let feed = Arc::new(
        CategoryFeed::new(fetch_config, cli.feed_urls()).context("failed to build the feed client")?,
    );

    let settings = cli.settings();
    let state = Arc::new(BotState::load(&cli.state_dir, feed, platform, settings.clone()));
    let announcer = Arc::new(Announcer::new(state));

    match cli.command {
        Some(Mode::Exec {
            guild,
            channel,
            text,
        }) => {
            let ctx = CommandContext {
                guild: GuildId(guild),
                channel: ChannelId(channel),
                message: None,
                permissions: Permissions::administrator(),
            };
            CommandHandler::new(announcer)
                .dispatch(&ctx, &text.join(" "))
                .await
                .context("command failed")?;
        }
        Some(Mode::Run) | None => {
            info!(
                "Starting news announcer: every {:?}, {} items per category, state in {}",
                settings.check_interval,
                settings.feed_limit,
                cli.state_dir.display()
            );

            let scheduler = Scheduler::new(announcer);
            let handle = scheduler.spawn(IntervalTicker::new(settings.check_interval));

            tokio::select! {
                joined = handle => {
                    joined.context("scheduler task panicked")??;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_check_interval_is_rejected() {
        assert!(Cli::try_parse_from(["news-announcer", "--check-interval", "0"]).is_err());

        let cli = Cli::try_parse_from(["news-announcer", "--check-interval", "60"]).unwrap();
        assert_eq!(cli.settings().check_interval, Duration::from_secs(60));
    }

    #[test]
    fn exec_collects_the_command_text() {
        let cli = Cli::try_parse_from([
            "news-announcer",
            "exec",
            "--guild",
            "1",
            "--channel",
            "2",
            "!setrole",
            "linux",
            "<@&3>",
        ])
        .unwrap();

        match cli.command {
            Some(Mode::Exec { guild, channel, text }) => {
                assert_eq!((guild, channel), (1, 2));
                assert_eq!(text.join(" "), "!setrole linux <@&3>");
            }
            _ => panic!("expected exec"),
        }
    }
}
