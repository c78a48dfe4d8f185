//! # Budget bot
//!
//! Wires the budget handlers into an [`update_dispatcher::Dispatcher`] and runs it on Telegram long polling.
//! Conversations: create an income (button → name) and top up an income (`+500 lunch` → name).

pub mod cli;
pub mod config;
pub mod handlers;
pub mod registry;
pub mod runner;
pub mod service;

pub use cli::{Cli, Commands};
pub use config::BotConfig;
pub use registry::{build_registry, CREATE_INCOME_FLOW, TOP_UP_FLOW, TOP_UP_PATTERN};
pub use runner::{build_dispatcher, run_bot};
pub use service::{Budget, BudgetService, Income, InMemoryBudgetService, ServiceError};
