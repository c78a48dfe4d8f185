//! Listing incomes and the create-income conversation.

use async_trait::async_trait;
use budget_core::{ActionButton, Bot, Event, HandlerError};
use std::sync::Arc;
use tracing::{info, instrument};
use update_dispatcher::{Action, Signal};

use super::{format_incomes, CREATE_INCOME_CALLBACK, INCOME_CREATING};
use crate::service::{BudgetService, ServiceError};

const NO_BUDGET: &str = "This chat has no budget yet. Add me to a group to start one.";

/// `/incomes`: lists the chat's incomes with a "Create income" button.
pub struct ListIncomesAction {
    bot: Arc<dyn Bot>,
    service: Arc<dyn BudgetService>,
}

impl ListIncomesAction {
    pub fn new(bot: Arc<dyn Bot>, service: Arc<dyn BudgetService>) -> Self {
        Self { bot, service }
    }
}

#[async_trait]
impl Action for ListIncomesAction {
    #[instrument(skip(self, event), fields(chat_id = event.chat.id))]
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        let incomes = match self.service.list_incomes(event.chat.id).await {
            Ok(incomes) => incomes,
            Err(ServiceError::BudgetNotFound(_)) => {
                self.bot.reply_to(event, NO_BUDGET).await?;
                return Ok(Signal::Unchanged);
            }
            Err(e) => return Err(e.into()),
        };
        let text = if incomes.is_empty() {
            "No incomes yet.".to_string()
        } else {
            format!("Incomes:\n{}", format_incomes(&incomes))
        };
        self.bot
            .send_with_actions(
                &event.chat,
                &text,
                &[ActionButton::new("Create income", CREATE_INCOME_CALLBACK)],
            )
            .await?;
        Ok(Signal::Unchanged)
    }
}

/// Entry of the create-income flow: asks for the new income's name.
pub struct CreateIncomeInfoAction {
    bot: Arc<dyn Bot>,
}

impl CreateIncomeInfoAction {
    pub fn new(bot: Arc<dyn Bot>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Action for CreateIncomeInfoAction {
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        self.bot
            .reply_to(event, "Send the name of the new income, or /cancel.")
            .await?;
        Ok(Signal::advance(INCOME_CREATING))
    }
}

/// Creates the income named by the message. An existing name keeps the conversation open for another try.
pub struct CreateIncomeAction {
    bot: Arc<dyn Bot>,
    service: Arc<dyn BudgetService>,
}

impl CreateIncomeAction {
    pub fn new(bot: Arc<dyn Bot>, service: Arc<dyn BudgetService>) -> Self {
        Self { bot, service }
    }
}

#[async_trait]
impl Action for CreateIncomeAction {
    #[instrument(skip(self, event), fields(user_id = event.sender.id, chat_id = event.chat.id))]
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        let name = event.text().unwrap_or_default().trim();
        if name.is_empty() {
            self.bot.reply_to(event, "The name can't be empty, try again.").await?;
            return Ok(Signal::Unchanged);
        }
        match self.service.create_income(event.chat.id, name).await {
            Ok(income) => {
                info!(income = %income.name, "step: income created");
                self.bot
                    .reply_to(event, &format!("Income \"{}\" created.", income.name))
                    .await?;
                Ok(Signal::End)
            }
            Err(ServiceError::IncomeExists(name)) => {
                self.bot
                    .reply_to(
                        event,
                        &format!("Income \"{}\" already exists. Send another name, or /cancel.", name),
                    )
                    .await?;
                Ok(Signal::Unchanged)
            }
            Err(ServiceError::BudgetNotFound(_)) => {
                self.bot.reply_to(event, NO_BUDGET).await?;
                Ok(Signal::End)
            }
            Err(e) => Err(e.into()),
        }
    }
}
