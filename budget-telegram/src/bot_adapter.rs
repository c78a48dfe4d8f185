//! Wraps teloxide::Bot and implements [`budget_core::Bot`]. Production code sends via Telegram; tests substitute another Bot impl.

use async_trait::async_trait;
use budget_core::{ActionButton, Bot as CoreBot, BotError, Chat, Result};
use teloxide::payloads::SendMessageSetters;
use teloxide::requests::Requester;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};

/// Thin wrapper around teloxide::Bot that implements budget-core's Bot trait.
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    /// Creates an adapter from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

fn keyboard(buttons: &[ActionButton]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.data.clone())]),
    )
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(|e| BotError::Bot(e.to_string()))?;
        Ok(())
    }

    async fn send_with_actions(
        &self,
        chat: &Chat,
        text: &str,
        buttons: &[ActionButton],
    ) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.id), text.to_string())
            .reply_markup(keyboard(buttons))
            .await
            .map_err(|e| BotError::Bot(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_has_one_row_per_button() {
        let markup = keyboard(&[
            ActionButton::new("Create income", "_create_income"),
            ActionButton::new("Other", "_other"),
        ]);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert!(markup.inline_keyboard.iter().all(|row| row.len() == 1));
        assert_eq!(markup.inline_keyboard[0][0].text, "Create income");
    }
}
