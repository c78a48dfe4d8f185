//! # budget-telegram
//!
//! Telegram layer: adapters from teloxide updates to [`budget_core::Event`], the [`budget_core::Bot`]
//! implementation, minimal config, and the long-polling runner feeding an [`update_dispatcher::Dispatcher`].
//! No budget logic lives here.

mod adapters;
mod bot_adapter;
mod config;
mod runner;

pub use adapters::{
    TelegramCallbackWrapper, TelegramMemberUpdateWrapper, TelegramMessageWrapper,
    TelegramUserWrapper,
};
pub use bot_adapter::TelegramBotAdapter;
pub use config::TelegramConfig;
pub use runner::{build_bot, run_polling};
