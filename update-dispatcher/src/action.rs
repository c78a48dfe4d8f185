//! Handler actions and the signal they hand back to the dispatcher.

use async_trait::async_trait;
use budget_core::{Event, HandlerError};
use std::future::Future;
use std::sync::Arc;

/// What the dispatcher should do with the caller's conversation after an action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Move (or start) the conversation in the named state.
    Advance(String),
    /// Finish the conversation.
    End,
    /// Leave the conversation as it is.
    Unchanged,
}

impl Signal {
    pub fn advance(state: impl Into<String>) -> Self {
        Signal::Advance(state.into())
    }
}

/// Business logic run when a handler's filter matches. An `Err` is logged by the dispatcher and swallowed.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError>;
}

/// [`Action`] backed by an async closure; the closure receives its own copy of the event.
pub struct FnAction<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Action for FnAction<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Signal, HandlerError>> + Send,
{
    async fn run(&self, event: &Event) -> Result<Signal, HandlerError> {
        (self.f)(event.clone()).await
    }
}

/// Wraps an async closure as a shared [`Action`].
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn Action>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Signal, HandlerError>> + Send + 'static,
{
    Arc::new(FnAction { f })
}
