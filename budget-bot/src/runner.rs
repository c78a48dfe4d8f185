use anyhow::{Context, Result};
use budget_core::{init_tracing, Bot};
use budget_telegram::{build_bot, run_polling, TelegramBotAdapter};
use std::sync::Arc;
use tracing::{info, instrument};
use update_dispatcher::{ConversationStore, Dispatcher, InMemoryConversationStore};

use crate::config::BotConfig;
use crate::handlers::TopUpDrafts;
use crate::registry::build_registry;
use crate::service::{BudgetService, InMemoryBudgetService};

/// Builds the dispatcher for the given outbound bot and budget service. No Telegram connection is made;
/// integration tests drive the returned dispatcher with fake events.
pub fn build_dispatcher(
    config: &BotConfig,
    bot: Arc<dyn Bot>,
    service: Arc<dyn BudgetService>,
) -> Result<Dispatcher> {
    let ttl = config.conversation_ttl();
    let store: Arc<dyn ConversationStore> = match ttl {
        Some(ttl) => Arc::new(InMemoryConversationStore::with_ttl(ttl)),
        None => Arc::new(InMemoryConversationStore::new()),
    };
    let drafts = ttl.map_or_else(TopUpDrafts::new, TopUpDrafts::with_ttl);
    let registry =
        build_registry(bot, service, drafts).context("Failed to build handler registry")?;
    Ok(Dispatcher::new(Arc::new(registry), store))
}

/// Main entry: validate config, init logging (creating the log directory), wire handlers, then poll
/// Telegram until stopped.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    config.validate()?;
    init_tracing(config.log_file())?;

    info!(
        conversation_ttl_secs = ?config.conversation_ttl_secs,
        poll_timeout_secs = config.telegram.poll_timeout_secs,
        "Initializing bot"
    );

    let teloxide_bot = build_bot(&config.telegram)?;
    let bot: Arc<dyn Bot> = Arc::new(TelegramBotAdapter::new(teloxide_bot.clone()));
    let service: Arc<dyn BudgetService> = Arc::new(InMemoryBudgetService::new());
    let dispatcher = build_dispatcher(&config, bot, service)?;

    run_polling(teloxide_bot, dispatcher, &config.telegram).await
}
