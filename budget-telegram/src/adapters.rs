//! Adapters from Telegram (teloxide) types to budget_core types.

use budget_core::{
    Chat, ChatType, Event, EventPayload, MemberStatus, ToCoreEvent, ToCoreUser, User,
};
use teloxide::types::{CallbackQuery, ChatMemberStatus, ChatMemberUpdated};

/// Wraps a teloxide User for conversion to core [`User`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> ToCoreUser for TelegramUserWrapper<'a> {
    fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
            is_bot: self.0.is_bot,
        }
    }
}

fn to_core_chat(chat: &teloxide::types::Chat) -> Chat {
    let chat_type = if chat.is_private() {
        ChatType::Private
    } else if chat.is_group() {
        ChatType::Group
    } else if chat.is_supergroup() {
        ChatType::Supergroup
    } else {
        ChatType::Channel
    };
    Chat {
        id: chat.id.0,
        chat_type,
    }
}

fn to_core_status(status: ChatMemberStatus) -> MemberStatus {
    match status {
        ChatMemberStatus::Owner => MemberStatus::Owner,
        ChatMemberStatus::Administrator => MemberStatus::Administrator,
        ChatMemberStatus::Member => MemberStatus::Member,
        ChatMemberStatus::Restricted => MemberStatus::Restricted,
        ChatMemberStatus::Left => MemberStatus::Left,
        ChatMemberStatus::Banned => MemberStatus::Banned,
    }
}

/// Wraps a teloxide Message for conversion to a message [`Event`].
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> ToCoreEvent for TelegramMessageWrapper<'a> {
    fn to_core(&self) -> Event {
        let sender = self
            .0
            .from
            .as_ref()
            .map(|u| TelegramUserWrapper(u).to_core())
            .unwrap_or_else(|| User::with_id(0));
        Event::new(
            sender,
            to_core_chat(&self.0.chat),
            EventPayload::Message {
                message_id: self.0.id.to_string(),
                text: self.0.text().map(str::to_string),
            },
        )
    }
}

/// Wraps a teloxide CallbackQuery for conversion to a callback [`Event`].
///
/// Callbacks from inline-mode messages carry no chat; they are keyed to the sender's private chat.
pub struct TelegramCallbackWrapper<'a>(pub &'a CallbackQuery);

impl<'a> ToCoreEvent for TelegramCallbackWrapper<'a> {
    fn to_core(&self) -> Event {
        let sender = TelegramUserWrapper(&self.0.from).to_core();
        let chat = self
            .0
            .message
            .as_ref()
            .map(|m| to_core_chat(m.chat()))
            .unwrap_or(Chat {
                id: sender.id,
                chat_type: ChatType::Private,
            });
        let message_id = self.0.message.as_ref().map(|m| m.id().to_string());
        Event::new(
            sender,
            chat,
            EventPayload::Callback {
                data: self.0.data.clone(),
                message_id,
            },
        )
    }
}

/// Wraps a teloxide ChatMemberUpdated (the bot's own membership) for conversion to a membership [`Event`].
pub struct TelegramMemberUpdateWrapper<'a>(pub &'a ChatMemberUpdated);

impl<'a> ToCoreEvent for TelegramMemberUpdateWrapper<'a> {
    fn to_core(&self) -> Event {
        Event::new(
            TelegramUserWrapper(&self.0.from).to_core(),
            to_core_chat(&self.0.chat),
            EventPayload::MembershipChange {
                old_status: to_core_status(self.0.old_chat_member.status()),
                new_status: to_core_status(self.0.new_chat_member.status()),
            },
        )
    }
}
