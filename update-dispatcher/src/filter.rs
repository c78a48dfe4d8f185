//! Filter predicates: pure classification of an [`Event`].
//!
//! Filters are built once at startup and combined with [`Filter::and`], [`Filter::or`] and `!`; handlers never
//! branch on event shape at runtime.

use crate::error::DispatchError;
use budget_core::{Event, EventKind};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

type Predicate = dyn Fn(&Event) -> bool + Send + Sync;

/// Kind of bot membership change a [`Filter::membership`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipFilter {
    /// Any membership change.
    Any,
    /// Changes in group or supergroup chats.
    InGroup,
    /// The bot became part of the chat (was left or banned).
    Joined,
    /// The bot left or was removed from the chat.
    Left,
}

/// Pure, total, side-effect-free predicate over events. Cheap to clone.
#[derive(Clone)]
pub struct Filter {
    predicate: Arc<Predicate>,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter")
    }
}

impl Filter {
    /// Wraps an arbitrary predicate. It must not perform I/O.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.predicate)(event)
    }

    /// Matches every event.
    pub fn any() -> Self {
        Self::new(|_| true)
    }

    /// Message with text (commands included).
    pub fn text() -> Self {
        Self::new(|event| event.text().is_some())
    }

    /// Text message that is not a bot command.
    pub fn no_command() -> Self {
        Self::new(|event| event.text().is_some() && event.command().is_none())
    }

    /// Bot command with exactly this name; a leading `/` in `name` is ignored.
    pub fn command(name: impl Into<String>) -> Self {
        let name: String = name.into();
        let name = name.trim_start_matches('/').to_string();
        Self::new(move |event| event.command() == Some(name.as_str()))
    }

    /// Message text matching `pattern` (unanchored). Commands never match.
    pub fn regex(pattern: &str) -> Result<Self, DispatchError> {
        let re = Regex::new(pattern).map_err(|source| DispatchError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::new(move |event| {
            event.command().is_none() && event.text().is_some_and(|text| re.is_match(text))
        }))
    }

    /// Callback event whose data equals `id` exactly.
    pub fn callback_data(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self::new(move |event| event.callback_data() == Some(id.as_str()))
    }

    /// Bot membership change of the given kind.
    pub fn membership(kind: MembershipFilter) -> Self {
        Self::new(move |event| {
            let Some((old, new)) = event.membership_change() else {
                return false;
            };
            match kind {
                MembershipFilter::Any => true,
                MembershipFilter::InGroup => event.chat.chat_type.is_group(),
                MembershipFilter::Joined => !old.is_present() && new.is_present(),
                MembershipFilter::Left => old.is_present() && !new.is_present(),
            }
        })
    }

    /// Matches events of the given kind.
    pub fn kind(kind: EventKind) -> Self {
        Self::new(move |event| event.kind() == kind)
    }

    pub fn and(self, other: Filter) -> Self {
        Self::new(move |event| self.matches(event) && other.matches(event))
    }

    pub fn or(self, other: Filter) -> Self {
        Self::new(move |event| self.matches(event) || other.matches(event))
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::new(move |event| !self.matches(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budget_core::{Chat, ChatType, EventPayload, MemberStatus, User};

    fn event(chat_type: ChatType, payload: EventPayload) -> Event {
        Event::new(
            User::with_id(7),
            Chat {
                id: -100,
                chat_type,
            },
            payload,
        )
    }

    fn text(t: &str) -> Event {
        event(
            ChatType::Private,
            EventPayload::Message {
                message_id: "1".to_string(),
                text: Some(t.to_string()),
            },
        )
    }

    fn membership(chat_type: ChatType, old: MemberStatus, new: MemberStatus) -> Event {
        event(
            chat_type,
            EventPayload::MembershipChange {
                old_status: old,
                new_status: new,
            },
        )
    }

    #[test]
    fn test_command_filter() {
        let f = Filter::command("cancel");
        assert!(f.matches(&text("/cancel")));
        assert!(f.matches(&text("/cancel@budget_bot")));
        assert!(!f.matches(&text("/cancelled")));
        assert!(!f.matches(&text("cancel")));
        assert!(Filter::command("/cancel").matches(&text("/cancel")));
    }

    #[test]
    fn test_regex_filter_rejects_commands() {
        let f = Filter::regex(r"^\+\d+\s+.*").unwrap();
        assert!(f.matches(&text("+500 groceries")));
        assert!(!f.matches(&text("500 groceries")));
        assert!(!f.matches(&text("+500")));

        let any_text = Filter::regex(".*").unwrap();
        assert!(any_text.matches(&text("hello")));
        assert!(!any_text.matches(&text("/incomes")));
    }

    #[test]
    fn test_regex_filter_invalid_pattern() {
        let err = Filter::regex("(unclosed").unwrap_err();
        assert!(matches!(err, DispatchError::InvalidPattern { .. }));
    }

    #[test]
    fn test_combinators() {
        let not_cancel = !Filter::command("cancel");
        assert!(not_cancel.matches(&text("/incomes")));
        assert!(!not_cancel.matches(&text("/cancel")));

        let either = Filter::command("cancel").or(Filter::command("stop"));
        assert!(either.matches(&text("/stop")));
        assert!(!either.matches(&text("stop")));

        let both = Filter::text().and(!Filter::no_command());
        assert!(both.matches(&text("/incomes")));
        assert!(!both.matches(&text("Salary")));
    }

    #[test]
    fn test_no_command_filter() {
        let f = Filter::no_command();
        assert!(f.matches(&text("Salary")));
        assert!(!f.matches(&text("/incomes")));
        let sticker = event(
            ChatType::Private,
            EventPayload::Message {
                message_id: "1".to_string(),
                text: None,
            },
        );
        assert!(!f.matches(&sticker));
        assert!(!Filter::text().matches(&sticker));
    }

    #[test]
    fn test_callback_filter() {
        let f = Filter::callback_data("_create_income");
        let cb = |data: &str| {
            event(
                ChatType::Group,
                EventPayload::Callback {
                    data: Some(data.to_string()),
                    message_id: None,
                },
            )
        };
        assert!(f.matches(&cb("_create_income")));
        assert!(!f.matches(&cb("_create_income_x")));
        assert!(!f.matches(&text("_create_income")));
    }

    #[test]
    fn test_membership_filters() {
        let added = membership(ChatType::Supergroup, MemberStatus::Left, MemberStatus::Member);
        let removed = membership(ChatType::Group, MemberStatus::Member, MemberStatus::Banned);
        let private = membership(ChatType::Private, MemberStatus::Banned, MemberStatus::Member);

        let in_group = Filter::membership(MembershipFilter::InGroup);
        assert!(in_group.matches(&added));
        assert!(in_group.matches(&removed));
        assert!(!in_group.matches(&private));

        let joined_group = in_group.and(Filter::membership(MembershipFilter::Joined));
        assert!(joined_group.matches(&added));
        assert!(!joined_group.matches(&removed));
        assert!(!joined_group.matches(&private));

        assert!(Filter::membership(MembershipFilter::Left).matches(&removed));
        assert!(Filter::membership(MembershipFilter::Any).matches(&private));
        assert!(!Filter::membership(MembershipFilter::Any).matches(&text("hi")));
    }

    #[test]
    fn test_or_combinator() {
        let f = Filter::command("cancel").or(Filter::command("stop"));
        assert!(f.matches(&text("/cancel")));
        assert!(f.matches(&text("/stop")));
        assert!(!f.matches(&text("/start")));
        assert!(Filter::kind(EventKind::Message).matches(&text("x")));
    }
}
