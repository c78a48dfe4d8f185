//! Long-polling runner: converts Telegram updates to core events and hands them to the [`Dispatcher`].
//!
//! Updates are distributed by (sender, chat), so one pair's events are processed in arrival order while
//! different pairs run concurrently; a hanging handler only holds up its own pair.

use anyhow::{Context, Result};
use budget_core::ToCoreEvent;
use std::time::Duration;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::requests::{Requester, ResponseResult};
use teloxide::types::{AllowedUpdate, CallbackQuery, ChatMemberUpdated, Message, Update};
use teloxide::update_listeners::Polling;
use teloxide::dptree;
use tracing::{debug, info, instrument, warn};
use update_dispatcher::{DispatchOutcome, Dispatcher};

use super::adapters::{TelegramCallbackWrapper, TelegramMemberUpdateWrapper, TelegramMessageWrapper};
use super::config::TelegramConfig;

/// Creates the teloxide Bot from config, pointing it at a custom API URL when one is set.
pub fn build_bot(config: &TelegramConfig) -> Result<teloxide::Bot> {
    let mut bot = teloxide::Bot::new(config.bot_token.clone());
    if let Some(url) = &config.telegram_api_url {
        let url = reqwest::Url::parse(url)
            .with_context(|| format!("TELEGRAM_API_URL is not a valid URL: {}", url))?;
        bot = bot.set_api_url(url);
    }
    Ok(bot)
}

/// Identifies the bot with Telegram, then polls and dispatches updates until the process is stopped.
///
/// Failing `get_me` is the only fatal error; everything that goes wrong for a single update is logged.
#[instrument(skip(bot, dispatcher, config))]
pub async fn run_polling(
    bot: teloxide::Bot,
    dispatcher: Dispatcher,
    config: &TelegramConfig,
) -> Result<()> {
    let me = bot
        .get_me()
        .await
        .context("Failed to identify the bot with Telegram")?;
    info!(
        username = ?me.user.username,
        drop_pending_updates = config.drop_pending_updates,
        "Bot has been started"
    );

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
        .branch(Update::filter_my_chat_member().endpoint(on_my_chat_member));

    let mut polling = Polling::builder(bot.clone())
        .timeout(Duration::from_secs(config.poll_timeout_secs))
        .allowed_updates(vec![
            AllowedUpdate::Message,
            AllowedUpdate::CallbackQuery,
            AllowedUpdate::MyChatMember,
        ]);
    if config.drop_pending_updates {
        polling = polling.drop_pending_updates();
    }
    let listener = polling.delete_webhook().await.build();

    teloxide::dispatching::Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .distribution_function(conversation_key)
        .default_handler(|update| async move {
            debug!(update = ?update, "Unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error occurred while handling an update",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    info!("Polling stopped");
    Ok(())
}

fn conversation_key(update: &Update) -> Option<(u64, i64)> {
    Some((update.from()?.id.0, update.chat()?.id.0))
}

async fn on_message(msg: Message, dispatcher: Dispatcher) -> ResponseResult<()> {
    let event = TelegramMessageWrapper(&msg).to_core();
    match event.text() {
        Some(text) => info!(
            user_id = event.sender.id,
            chat_id = event.chat.id,
            message_content = %text,
            "Received message"
        ),
        None => info!(
            user_id = event.sender.id,
            chat_id = event.chat.id,
            "Received non-text message"
        ),
    }
    report(dispatcher.dispatch(&event).await);
    Ok(())
}

async fn on_callback(
    bot: teloxide::Bot,
    query: CallbackQuery,
    dispatcher: Dispatcher,
) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        warn!(error = %e, "Failed to answer callback query");
    }
    let event = TelegramCallbackWrapper(&query).to_core();
    info!(
        user_id = event.sender.id,
        chat_id = event.chat.id,
        data = ?event.callback_data(),
        "Received callback"
    );
    report(dispatcher.dispatch(&event).await);
    Ok(())
}

async fn on_my_chat_member(update: ChatMemberUpdated, dispatcher: Dispatcher) -> ResponseResult<()> {
    let event = TelegramMemberUpdateWrapper(&update).to_core();
    info!(
        user_id = event.sender.id,
        chat_id = event.chat.id,
        membership = ?event.membership_change(),
        "Received membership change"
    );
    report(dispatcher.dispatch(&event).await);
    Ok(())
}

fn report(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Dropped => debug!("step: update dropped, no handler matched"),
        DispatchOutcome::Handled {
            handler,
            transition,
            error,
        } => info!(
            handler = %handler,
            transition = ?transition,
            error = ?error,
            "step: update handled"
        ),
        DispatchOutcome::StoreUnavailable(e) => warn!(error = %e, "step: update skipped"),
    }
}
