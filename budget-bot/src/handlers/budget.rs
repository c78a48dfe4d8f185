//! Budget creation when the bot joins a group.

use async_trait::async_trait;
use budget_core::{Bot, Event, HandlerError};
use std::sync::Arc;
use tracing::{info, instrument};
use update_dispatcher::{Action, Signal};

use crate::service::{BudgetService, ServiceError};

/// Creates the chat's budget and greets the group. Never touches conversation state.
pub struct CreateBudgetAction {
    bot: Arc<dyn Bot>,
    service: Arc<dyn BudgetService>,
}

impl CreateBudgetAction {
    pub fn new(bot: Arc<dyn Bot>, service: Arc<dyn BudgetService>) -> Self {
        Self { bot, service }
    }
}

#[async_trait]
impl Action for CreateBudgetAction {
    #[instrument(skip(self, event), fields(chat_id = event.chat.id))]
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        let text = match self.service.create_budget(event.chat.id).await {
            Ok(_) => {
                "Hi! I've created a budget for this chat. Use /incomes to manage incomes.".to_string()
            }
            Err(ServiceError::BudgetExists(_)) => {
                let budget = self.service.get_budget(event.chat.id).await?;
                info!(chat_id = event.chat.id, "Budget already exists, reusing it");
                format!(
                    "Welcome back! This chat's budget from {} is still here. Use /incomes to see it.",
                    budget.created_at.format("%Y-%m-%d")
                )
            }
            Err(e) => return Err(e.into()),
        };
        self.bot.send_message(&event.chat, &text).await?;
        Ok(Signal::Unchanged)
    }
}
