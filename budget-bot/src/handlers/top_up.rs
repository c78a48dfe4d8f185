//! Top-up conversation: `+500 lunch` starts it, the next plain message names the income.

use async_trait::async_trait;
use budget_core::{Bot, Event, HandlerError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use update_dispatcher::{Action, ConversationKey, Signal};

use super::{format_incomes, INCOME_CREATING};
use crate::service::{BudgetService, ServiceError};

/// Amount and note parsed from the message that started a top-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpDraft {
    pub amount: i64,
    pub note: String,
}

/// Pending top-ups per conversation key, shared by the top-up actions and cancel.
///
/// With a TTL, drafts older than it are treated as absent and swept on every insert, so drafts of
/// conversations that expired in the store don't pile up.
#[derive(Debug, Clone, Default)]
pub struct TopUpDrafts {
    drafts: Arc<RwLock<HashMap<ConversationKey, (TopUpDraft, Instant)>>>,
    ttl: Option<Duration>,
}

impl TopUpDrafts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drafts expire after `ttl`; use the conversation store's TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    fn is_live(&self, stored_at: Instant) -> bool {
        self.ttl.map_or(true, |ttl| stored_at.elapsed() < ttl)
    }

    pub async fn insert(&self, key: ConversationKey, draft: TopUpDraft) {
        let mut drafts = self.drafts.write().await;
        if self.ttl.is_some() {
            let before = drafts.len();
            drafts.retain(|_, (_, stored_at)| self.is_live(*stored_at));
            if drafts.len() < before {
                debug!(swept = before - drafts.len(), "Expired top-up drafts removed");
            }
        }
        drafts.insert(key, (draft, Instant::now()));
    }

    pub async fn get(&self, key: &ConversationKey) -> Option<TopUpDraft> {
        self.drafts
            .read()
            .await
            .get(key)
            .filter(|(_, stored_at)| self.is_live(*stored_at))
            .map(|(draft, _)| draft.clone())
    }

    pub async fn remove(&self, key: &ConversationKey) -> Option<TopUpDraft> {
        self.drafts.write().await.remove(key).map(|(draft, _)| draft)
    }

    /// Number of stored drafts, expired ones included until the next insert.
    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Parses `+<amount> <note>`. Returns None for anything else, including amounts that overflow.
pub fn parse_top_up(text: &str) -> Option<TopUpDraft> {
    let rest = text.trim().strip_prefix('+')?;
    let (amount, note) = rest.split_once(char::is_whitespace)?;
    let amount: i64 = amount.parse().ok()?;
    Some(TopUpDraft {
        amount,
        note: note.trim().to_string(),
    })
}

/// Entry of the top-up flow: remembers the draft and asks which income to top up.
pub struct StartTopUpAction {
    bot: Arc<dyn Bot>,
    service: Arc<dyn BudgetService>,
    drafts: TopUpDrafts,
}

impl StartTopUpAction {
    pub fn new(bot: Arc<dyn Bot>, service: Arc<dyn BudgetService>, drafts: TopUpDrafts) -> Self {
        Self {
            bot,
            service,
            drafts,
        }
    }
}

#[async_trait]
impl Action for StartTopUpAction {
    #[instrument(skip(self, event), fields(user_id = event.sender.id, chat_id = event.chat.id))]
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        let Some(draft) = event.text().and_then(parse_top_up) else {
            self.bot.reply_to(event, "That amount doesn't look right.").await?;
            return Ok(Signal::End);
        };
        if draft.amount <= 0 {
            self.bot.reply_to(event, "The amount must be positive.").await?;
            return Ok(Signal::End);
        }

        let incomes = match self.service.list_incomes(event.chat.id).await {
            Ok(incomes) => incomes,
            Err(ServiceError::BudgetNotFound(_)) => {
                self.bot
                    .reply_to(event, "This chat has no budget yet. Add me to a group to start one.")
                    .await?;
                return Ok(Signal::End);
            }
            Err(e) => return Err(e.into()),
        };

        let mut text = format!("Top up by {}", draft.amount);
        if !draft.note.is_empty() {
            text.push_str(&format!(" ({})", draft.note));
        }
        text.push_str(". Which income? Send its name, a new name creates it, or /cancel.");
        if !incomes.is_empty() {
            text.push('\n');
            text.push_str(&format_incomes(&incomes));
        }
        self.bot.reply_to(event, &text).await?;

        info!(amount = draft.amount, "step: top-up draft stored");
        self.drafts
            .insert(ConversationKey::from_event(event), draft)
            .await;
        Ok(Signal::advance(INCOME_CREATING))
    }
}

/// Applies the pending draft to the named income, creating the income first if needed.
///
/// The draft is only dropped on success, so a failed call can be retried with the next message.
pub struct TopUpIncomeAction {
    bot: Arc<dyn Bot>,
    service: Arc<dyn BudgetService>,
    drafts: TopUpDrafts,
}

impl TopUpIncomeAction {
    pub fn new(bot: Arc<dyn Bot>, service: Arc<dyn BudgetService>, drafts: TopUpDrafts) -> Self {
        Self {
            bot,
            service,
            drafts,
        }
    }
}

#[async_trait]
impl Action for TopUpIncomeAction {
    #[instrument(skip(self, event), fields(user_id = event.sender.id, chat_id = event.chat.id))]
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        let key = ConversationKey::from_event(event);
        let Some(draft) = self.drafts.get(&key).await else {
            warn!(key = %key, "No pending top-up for conversation");
            self.bot.reply_to(event, "Nothing to top up, start again with +amount.").await?;
            return Ok(Signal::End);
        };
        let name = event.text().unwrap_or_default().trim();
        if name.is_empty() {
            self.bot.reply_to(event, "Send the income name, or /cancel.").await?;
            return Ok(Signal::Unchanged);
        }

        let chat_id = event.chat.id;
        let income = match self.service.top_up_income(chat_id, name, draft.amount).await {
            Ok(income) => income,
            Err(ServiceError::IncomeNotFound(_)) => {
                self.service.create_income(chat_id, name).await?;
                info!(income = %name, "step: income created for top-up");
                self.service
                    .top_up_income(chat_id, name, draft.amount)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };
        self.drafts.remove(&key).await;

        self.bot
            .reply_to(
                event,
                &format!(
                    "\"{}\" topped up by {}. Balance: {}.",
                    income.name, draft.amount, income.balance
                ),
            )
            .await?;
        Ok(Signal::End)
    }
}
