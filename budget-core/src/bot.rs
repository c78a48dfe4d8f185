//! Bot abstraction for sending replies.
//!
//! [`Bot`] is transport-agnostic; budget-telegram implements it via teloxide and tests substitute a recording mock.

use crate::error::Result;
use crate::types::{Chat, Event};
use async_trait::async_trait;

/// Inline button attached to an outgoing message. Pressing it produces a callback event carrying `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    pub data: String,
}

impl ActionButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Abstraction for sending messages. Implementations map to a transport (e.g. Telegram).
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a text message to the given chat.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()>;

    /// Sends a reply to the chat the event came from.
    async fn reply_to(&self, event: &Event, text: &str) -> Result<()> {
        self.send_message(&event.chat, text).await
    }

    /// Sends a text message with one row of buttons per [`ActionButton`].
    async fn send_with_actions(&self, chat: &Chat, text: &str, buttons: &[ActionButton])
        -> Result<()>;
}
