//! Errors of the conversation store and of registry construction.

use crate::store::ConversationKey;
use thiserror::Error;

/// Conversation store failures. `NoSession` and `AlreadyActive` mean the dispatcher broke an invariant;
/// they end the current dispatch cycle but never the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("No active conversation for {0}")]
    NoSession(ConversationKey),

    #[error("Conversation '{flow}' already active for {key}")]
    AlreadyActive { key: ConversationKey, flow: String },

    #[error("Conversation store backend error: {0}")]
    Backend(String),
}

/// Startup errors raised while building filters, flows and the registry.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Flow '{0}' has no entry handler")]
    EmptyFlow(String),

    #[error("Flow '{0}' registered twice")]
    DuplicateFlow(String),
}
