//! Core types: user, chat, inbound event and its payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identity (id, username, names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_bot: bool,
}

impl User {
    /// Creates a user with only an id; names are left empty.
    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
            is_bot: false,
        }
    }
}

/// Kind of chat an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatType {
    /// True for groups and supergroups.
    pub fn is_group(&self) -> bool {
        matches!(self, ChatType::Group | ChatType::Supergroup)
    }
}

/// Chat (private, group or channel) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: ChatType,
}

/// Membership status of the bot in a chat, as reported by membership-change updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    /// True if the member is part of the chat (left and banned are not).
    pub fn is_present(&self) -> bool {
        !matches!(self, MemberStatus::Left | MemberStatus::Banned)
    }
}

/// Discriminant of [`EventPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Message,
    Callback,
    MembershipChange,
}

/// Raw payload of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    /// A chat message. `text` is None for stickers, photos without caption, etc.
    Message {
        message_id: String,
        text: Option<String>,
    },
    /// An inline keyboard button press carrying the button's callback data.
    Callback {
        data: Option<String>,
        message_id: Option<String>,
    },
    /// The bot's own membership in the chat changed.
    MembershipChange {
        old_status: MemberStatus,
        new_status: MemberStatus,
    },
}

/// One inbound occurrence from the chat platform. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub sender: User,
    pub chat: Chat,
    pub payload: EventPayload,
    pub received_at: DateTime<Utc>,
}

impl Event {
    /// Builds an event with a fresh id and the current time.
    pub fn new(sender: User, chat: Chat, payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            chat,
            payload,
            received_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::Message { .. } => EventKind::Message,
            EventPayload::Callback { .. } => EventKind::Callback,
            EventPayload::MembershipChange { .. } => EventKind::MembershipChange,
        }
    }

    /// Message text, if this is a text message.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Message { text, .. } => text.as_deref(),
            _ => None,
        }
    }

    /// Command name without the leading slash and without an `@botname` suffix.
    ///
    /// Only text starting with `/` is a command, as Telegram only marks a bot command at offset 0:
    /// `"/incomes@budget_bot all"` yields `Some("incomes")`, `" /cancel"` and plain text yield None.
    pub fn command(&self) -> Option<&str> {
        let rest = self.text()?.strip_prefix('/')?;
        let token = rest.split(char::is_whitespace).next()?;
        let name = token.split('@').next().unwrap_or(token);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    pub fn callback_data(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Callback { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// `(old, new)` bot membership status for membership-change events.
    pub fn membership_change(&self) -> Option<(MemberStatus, MemberStatus)> {
        match self.payload {
            EventPayload::MembershipChange {
                old_status,
                new_status,
            } => Some((old_status, new_status)),
            _ => None,
        }
    }
}

/// Converts a transport-specific user type to core [`User`].
pub trait ToCoreUser: Send + Sync {
    fn to_core(&self) -> User;
}

/// Converts a transport-specific update type to core [`Event`].
pub trait ToCoreEvent: Send + Sync {
    fn to_core(&self) -> Event;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> Event {
        Event::new(
            User::with_id(1),
            Chat {
                id: 2,
                chat_type: ChatType::Private,
            },
            EventPayload::Message {
                message_id: "10".to_string(),
                text: Some(text.to_string()),
            },
        )
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(message("/incomes").command(), Some("incomes"));
        assert_eq!(message("/incomes@budget_bot").command(), Some("incomes"));
        assert_eq!(message("/cancel now").command(), Some("cancel"));
        assert_eq!(message("+500 lunch").command(), None);
        assert_eq!(message("/").command(), None);
        assert_eq!(message("hello /cancel").command(), None);
        assert_eq!(message(" /cancel").command(), None);
        assert_eq!(message("/ cancel").command(), None);
        assert_eq!(message("/@budget_bot").command(), None);
    }

    #[test]
    fn test_kind_and_accessors() {
        let cb = Event::new(
            User::with_id(1),
            Chat {
                id: 2,
                chat_type: ChatType::Group,
            },
            EventPayload::Callback {
                data: Some("_create_income".to_string()),
                message_id: None,
            },
        );
        assert_eq!(cb.kind(), EventKind::Callback);
        assert_eq!(cb.callback_data(), Some("_create_income"));
        assert_eq!(cb.text(), None);
        assert_eq!(cb.command(), None);
        assert!(cb.chat.chat_type.is_group());
    }

    #[test]
    fn test_member_status_presence() {
        assert!(MemberStatus::Member.is_present());
        assert!(MemberStatus::Administrator.is_present());
        assert!(!MemberStatus::Left.is_present());
        assert!(!MemberStatus::Banned.is_present());
    }
}
