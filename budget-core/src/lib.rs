//! # budget-core
//!
//! Core types and traits for the budget bot: [`Event`] and its payloads, the outbound [`Bot`] trait,
//! error types, and tracing initialization. Transport-agnostic; used by update-dispatcher, budget-telegram
//! and budget-bot.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::{ActionButton, Bot};
pub use error::{BotError, HandlerError, Result};
pub use logger::{init_tracing, open_log_file};
pub use types::{
    Chat, ChatType, Event, EventKind, EventPayload, MemberStatus, ToCoreEvent, ToCoreUser, User,
};
