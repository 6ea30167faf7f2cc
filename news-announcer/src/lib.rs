pub mod types;
pub mod storage;
pub mod ledger;
pub mod config_store;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod traits;
pub mod message;
pub mod state;
pub mod announcer;
pub mod scheduler;
pub mod discord;
pub mod commands;

pub use types::*;
pub use ledger::SeenLedger;
pub use config_store::{ConfigStore, RoleChange, ServerConfig};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::CategoryFeed;
pub use traits::*;
pub use message::OutgoingMessage;
pub use state::BotState;
pub use announcer::{Announcer, TickReport};
pub use scheduler::{IntervalTicker, ManualTicker, Scheduler, Ticker};
pub use discord::DiscordClient;
pub use commands::{Command, CommandContext, CommandHandler, Permissions};
