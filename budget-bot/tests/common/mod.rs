//! Shared helpers: recording [`MockBot`] and event builders.

#![allow(dead_code)]

use async_trait::async_trait;
use budget_core::{
    ActionButton, Bot, BotError, Chat, ChatType, Event, EventPayload, MemberStatus, Result, User,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const SENDER: i64 = 123;
pub const GROUP: i64 = -456;

/// One recorded outgoing message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub buttons: Vec<ActionButton>,
}

/// Bot that records every message instead of sending it. `fail_sends` makes every send return an error.
#[derive(Default)]
pub struct MockBot {
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: AtomicBool,
}

impl MockBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_text(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|m| m.text.clone())
    }

    fn record(&self, chat: &Chat, text: &str, buttons: &[ActionButton]) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BotError::Bot("network down".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat.id,
            text: text.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.record(chat, text, &[])
    }

    async fn send_with_actions(
        &self,
        chat: &Chat,
        text: &str,
        buttons: &[ActionButton],
    ) -> Result<()> {
        self.record(chat, text, buttons)
    }
}

fn group() -> Chat {
    Chat {
        id: GROUP,
        chat_type: ChatType::Supergroup,
    }
}

pub fn text(t: &str) -> Event {
    text_from(SENDER, t)
}

pub fn text_from(sender: i64, t: &str) -> Event {
    Event::new(
        User::with_id(sender),
        group(),
        EventPayload::Message {
            message_id: "1".to_string(),
            text: Some(t.to_string()),
        },
    )
}

pub fn callback(data: &str) -> Event {
    Event::new(
        User::with_id(SENDER),
        group(),
        EventPayload::Callback {
            data: Some(data.to_string()),
            message_id: Some("2".to_string()),
        },
    )
}

pub fn bot_added() -> Event {
    Event::new(
        User::with_id(SENDER),
        group(),
        EventPayload::MembershipChange {
            old_status: MemberStatus::Left,
            new_status: MemberStatus::Member,
        },
    )
}

pub fn bot_removed() -> Event {
    Event::new(
        User::with_id(SENDER),
        group(),
        EventPayload::MembershipChange {
            old_status: MemberStatus::Member,
            new_status: MemberStatus::Left,
        },
    )
}
