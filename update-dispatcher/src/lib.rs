//! # Update dispatcher
//!
//! Decides which handler runs for each inbound [`budget_core::Event`] and tracks multi-step conversations
//! per (sender, chat). An active conversation restricts candidates to its flow's exit handlers and the
//! handlers of its current state; otherwise the registry is scanned in registration order and the first
//! match wins. Exactly one handler runs per event; unmatched events are dropped.

pub mod action;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod registry;
pub mod store;

pub use action::{action_fn, Action, FnAction, Signal};
pub use dispatcher::{DispatchOutcome, Dispatcher, Transition};
pub use error::{ConversationError, DispatchError};
pub use filter::{Filter, MembershipFilter};
pub use registry::{Flow, FlowBuilder, HandlerBinding, HandlerRegistry, RegistryBuilder, Route};
pub use store::{
    ConversationKey, ConversationSession, ConversationStore, InMemoryConversationStore, KeyGuard,
    KeyLocks,
};

// Integration tests live in tests/dispatcher_test.rs and tests/conversation_store_test.rs
