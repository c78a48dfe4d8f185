use async_trait::async_trait;
use budget_core::{Bot, Event, HandlerError};
use std::sync::Arc;
use tracing::error;
use update_dispatcher::{Action, ConversationKey, Signal};

use super::top_up::TopUpDrafts;

pub const GOODBYE: &str = "Oh, goodbye!";

/// Says goodbye and drops any pending top-up. A failed reply is logged; the conversation ends regardless.
pub struct CancelAction {
    bot: Arc<dyn Bot>,
    drafts: TopUpDrafts,
}

impl CancelAction {
    pub fn new(bot: Arc<dyn Bot>, drafts: TopUpDrafts) -> Self {
        Self { bot, drafts }
    }
}

#[async_trait]
impl Action for CancelAction {
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        self.drafts.remove(&ConversationKey::from_event(event)).await;
        if let Err(e) = self.bot.reply_to(event, GOODBYE).await {
            error!(error = %e, chat_id = event.chat.id, "Failed to send cancel message");
        }
        Ok(Signal::End)
    }
}
