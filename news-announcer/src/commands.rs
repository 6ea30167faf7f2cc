use crate::announcer::Announcer;
use crate::config_store::RoleChange;
use crate::message::{role_mention, OutgoingMessage};
use crate::traits::ChannelResolution;
use crate::types::{Category, ChannelId, GuildId, MessageId, Result, RoleId};
use std::sync::Arc;
use tracing::{info, warn};

pub const COMMAND_PREFIX: char = '!';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub administrator: bool,
    pub manage_messages: bool,
}

impl Permissions {
    pub fn administrator() -> Self {
        Self {
            administrator: true,
            manage_messages: true,
        }
    }

    fn satisfies(&self, required: Requirement) -> bool {
        match required {
            Requirement::Anyone => true,
            Requirement::Administrator => self.administrator,
            Requirement::ManageMessages => self.administrator || self.manage_messages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    Administrator,
    ManageMessages,
}

impl Requirement {
    fn label(&self) -> &'static str {
        match self {
            Requirement::Anyone => "no",
            Requirement::Administrator => "the Administrator",
            Requirement::ManageMessages => "the Manage Messages",
        }
    }
}

/// Who invoked a command and where.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    pub guild: GuildId,
    pub channel: ChannelId,
    /// The invoking message, deleted by `!say`.
    pub message: Option<MessageId>,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetChannel,
    ShowConfig,
    Enable(Category),
    Disable(Category),
    SetRole(Category, RoleId),
    RemoveRole(Category, RoleId),
    ClearRoles(Category),
    ShowRoles,
    TestNews,
    Say(String),
    Help,
}

impl Command {
    /// `None` when `text` is not addressed to the bot. `Some(Err(usage))` when
    /// the command is known but its arguments are not.
    pub fn parse(text: &str) -> Option<std::result::Result<Command, String>> {
        let body = text.trim().strip_prefix(COMMAND_PREFIX)?;
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match name.to_lowercase().as_str() {
            "setchannel" => Ok(Command::SetChannel),
            "showconfig" => Ok(Command::ShowConfig),
            "showroles" => Ok(Command::ShowRoles),
            "testnews" => Ok(Command::TestNews),
            "help" => Ok(Command::Help),
            "enable" => parse_category(&args, "enable").map(Command::Enable),
            "disable" => parse_category(&args, "disable").map(Command::Disable),
            "clearroles" => parse_category(&args, "clearroles").map(Command::ClearRoles),
            "setrole" => parse_category_role(&args, "setrole").map(|(c, r)| Command::SetRole(c, r)),
            "removerole" => {
                parse_category_role(&args, "removerole").map(|(c, r)| Command::RemoveRole(c, r))
            }
            "say" if rest.is_empty() => Err("Use: `!say <message>`".to_string()),
            "say" => Ok(Command::Say(rest.to_string())),
            _ => return None,
        };
        Some(command)
    }

    pub fn requirement(&self) -> Requirement {
        match self {
            Command::ShowConfig | Command::ShowRoles | Command::Help => Requirement::Anyone,
            Command::Say(_) => Requirement::ManageMessages,
            _ => Requirement::Administrator,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SetChannel => "setchannel",
            Command::ShowConfig => "showconfig",
            Command::Enable(_) => "enable",
            Command::Disable(_) => "disable",
            Command::SetRole(..) => "setrole",
            Command::RemoveRole(..) => "removerole",
            Command::ClearRoles(_) => "clearroles",
            Command::ShowRoles => "showroles",
            Command::TestNews => "testnews",
            Command::Say(_) => "say",
            Command::Help => "help",
        }
    }
}

fn parse_category(args: &[&str], command: &str) -> std::result::Result<Category, String> {
    let usage = || format!("Use: `!{0} windows` or `!{0} linux`", command);
    match args {
        [category] => category.parse().map_err(|_| usage()),
        _ => Err(usage()),
    }
}

fn parse_category_role(args: &[&str], command: &str) -> std::result::Result<(Category, RoleId), String> {
    let usage = || format!("Use: `!{0} windows @Role` or `!{0} linux @Role`", command);
    match args {
        [category, role] => {
            let category: Category = category.parse().map_err(|_| usage())?;
            let role = parse_role(role).ok_or_else(usage)?;
            Ok((category, role))
        }
        _ => Err(usage()),
    }
}

/// Accepts a role mention (`<@&123>`) or a bare id.
pub fn parse_role(raw: &str) -> Option<RoleId> {
    let raw = raw.trim();
    let id = raw
        .strip_prefix("<@&")
        .and_then(|r| r.strip_suffix('>'))
        .unwrap_or(raw);
    id.parse().ok()
}

const HELP_TEXT: &str = "📖 **Commands:**\n\
`!setchannel` bind this channel and enable all news\n\
`!showconfig` show the current setup\n\
`!enable <windows|linux>` / `!disable <windows|linux>` toggle a category\n\
`!setrole <category> @Role` / `!removerole <category> @Role` manage pings\n\
`!clearroles <category>` remove every ping for a category\n\
`!showroles` list configured pings\n\
`!testnews` post the latest item of each category now\n\
`!say <message>` make the bot say something";

pub struct CommandHandler {
    announcer: Arc<Announcer>,
}

impl CommandHandler {
    pub fn new(announcer: Arc<Announcer>) -> Self {
        Self { announcer }
    }

    /// Parse and run `text`. Messages that are not commands are ignored.
    pub async fn dispatch(&self, ctx: &CommandContext, text: &str) -> Result<()> {
        match Command::parse(text) {
            None => Ok(()),
            Some(Err(usage)) => {
                self.reply(ctx, usage).await;
                Ok(())
            }
            Some(Ok(command)) => self.execute(ctx, command).await,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext, command: Command) -> Result<()> {
        let required = command.requirement();
        if !ctx.permissions.satisfies(required) {
            warn!("Denied !{} in server {}", command.name(), ctx.guild);
            self.reply(
                ctx,
                format!(
                    "⛔ You need {} permission to use `!{}`.",
                    required.label(),
                    command.name()
                ),
            )
            .await;
            return Ok(());
        }

        info!("Running !{} in server {}", command.name(), ctx.guild);
        let state = self.announcer.state();

        match command {
            Command::SetChannel => {
                state.config.write().await.set_channel(ctx.guild, ctx.channel)?;
                self.reply(ctx, format!("✅ News channel set to <#{}>", ctx.channel)).await;
            }
            Command::ShowConfig => self.show_config(ctx).await,
            Command::Enable(category) => self.toggle(ctx, category, true).await?,
            Command::Disable(category) => self.toggle(ctx, category, false).await?,
            Command::SetRole(category, role) => {
                let change = state.config.write().await.add_role(ctx.guild, category, role)?;
                let text = match change {
                    RoleChange::AlreadyPresent => {
                        format!("⚠️ {} is already configured for {}.", role_mention(role), category)
                    }
                    _ => format!("✅ Role added for **{}**: {}", category, role_mention(role)),
                };
                self.reply(ctx, text).await;
            }
            Command::RemoveRole(category, role) => {
                let change = state.config.write().await.remove_role(ctx.guild, category, role)?;
                let text = match change {
                    RoleChange::Removed => {
                        format!("🗑️ Role removed from **{}**: {}", category, role_mention(role))
                    }
                    _ => format!("⚠️ {} is not configured for {}.", role_mention(role), category),
                };
                self.reply(ctx, text).await;
            }
            Command::ClearRoles(category) => {
                let cleared = state.config.write().await.clear_roles(ctx.guild, category)?;
                let text = if cleared {
                    format!("🧹 All **{}** roles were removed.", category)
                } else {
                    "⚠️ This server is not configured.".to_string()
                };
                self.reply(ctx, text).await;
            }
            Command::ShowRoles => self.show_roles(ctx).await,
            Command::TestNews => self.test_news(ctx).await,
            Command::Say(text) => {
                if let Some(message) = ctx.message {
                    if let Err(e) = state.platform.delete_message(ctx.channel, message).await {
                        warn!("Could not delete message {} in {}: {}", message, ctx.channel, e);
                    }
                }
                self.reply(ctx, text).await;
            }
            Command::Help => self.reply(ctx, HELP_TEXT).await,
        }
        Ok(())
    }

    async fn toggle(&self, ctx: &CommandContext, category: Category, enable: bool) -> Result<()> {
        let applied = {
            let mut store = self.announcer.state().config.write().await;
            if enable {
                store.enable_category(ctx.guild, category)?
            } else {
                store.disable_category(ctx.guild, category)?
            }
        };

        let text = match (applied, enable) {
            (false, _) => "⚠️ Set a news channel first with `!setchannel`.".to_string(),
            (true, true) => format!("✅ **{}** news enabled.", category),
            (true, false) => format!("🔕 **{}** news disabled.", category),
        };
        self.reply(ctx, text).await;
        Ok(())
    }

    async fn show_config(&self, ctx: &CommandContext) {
        let state = self.announcer.state();
        let config = state.config.read().await.get(ctx.guild).cloned();
        let Some(config) = config else {
            self.reply(ctx, "⚠️ This server is not configured yet. Use `!setchannel`.")
                .await;
            return;
        };

        let channel = match config.channel_id {
            None => "not set".to_string(),
            Some(id) => match state.platform.resolve_channel(id).await {
                ChannelResolution::Resolved(channel) => channel.mention(),
                _ => "invalid channel".to_string(),
            },
        };

        self.reply(
            ctx,
            format!(
                "📡 **Current configuration:**\nChannel: {}\nWindows: {}\nLinux: {}",
                channel, config.windows, config.linux
            ),
        )
        .await;
    }

    async fn show_roles(&self, ctx: &CommandContext) {
        let config = self.announcer.state().config.read().await.get(ctx.guild).cloned();
        let lines: Vec<String> = config
            .iter()
            .flat_map(|config| config.roles.iter())
            .filter(|(_, roles)| !roles.is_empty())
            .map(|(category, roles)| {
                let mentions: Vec<String> = roles.iter().map(|r| role_mention(*r)).collect();
                format!("{}: {}", category, mentions.join(" "))
            })
            .collect();

        if lines.is_empty() {
            self.reply(ctx, "⚠️ No roles configured yet.").await;
        } else {
            self.reply(ctx, format!("📌 **Configured roles:**\n{}", lines.join("\n")))
                .await;
        }
    }

    /// Post the newest item of every category right away. The ledger is
    /// neither checked nor updated, so this can repeat an announcement.
    async fn test_news(&self, ctx: &CommandContext) {
        let state = self.announcer.state();
        self.reply(ctx, "🔎 Testing news delivery...").await;

        let channel_id = state
            .config
            .read()
            .await
            .get(ctx.guild)
            .and_then(|config| config.channel_id);
        let Some(channel_id) = channel_id else {
            self.reply(ctx, "⚠️ This server is not configured. Use `!setchannel`.")
                .await;
            return;
        };

        let channel = match state.platform.resolve_channel(channel_id).await {
            ChannelResolution::Resolved(channel) => channel,
            other => {
                warn!("testnews could not resolve channel {}: {:?}", channel_id, other);
                self.reply(ctx, "❌ Could not access the configured channel.").await;
                return;
            }
        };

        for category in Category::ALL {
            let items = state.feed.fetch_latest(category, 1).await;
            let Some(item) = items.first() else {
                self.reply(ctx, format!("No news found for {}", category)).await;
                continue;
            };
            if let Err(e) = self.announcer.post_news(ctx.guild, channel.id, item).await {
                warn!("testnews failed to post {}: {}", item.id, e);
                self.reply(ctx, format!("❌ Failed to post {} news.", category)).await;
            }
        }
    }

    async fn reply(&self, ctx: &CommandContext, text: impl Into<String>) {
        let message = OutgoingMessage::text(text);
        if let Err(e) = self
            .announcer
            .state()
            .platform
            .send_message(ctx.channel, &message)
            .await
        {
            warn!("Failed to reply in channel {}: {}", ctx.channel, e);
        }
    }
}
