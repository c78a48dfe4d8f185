//! Dispatcher: picks the one handler that runs for an event and applies its signal to the conversation store.

use crate::action::Signal;
use crate::registry::{Flow, HandlerBinding, HandlerRegistry, Route};
use crate::store::{ConversationKey, ConversationSession, ConversationStore};
use budget_core::{Event, HandlerError};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Effect of one dispatch on the caller's conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    None,
    Started { flow: String, state: String },
    Advanced { state: String },
    Ended,
}

/// What happened to one event. Dispatch never fails; errors are reported here and in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler matched.
    Dropped,
    /// `handler` ran. `error` carries a swallowed action or store error.
    Handled {
        handler: String,
        transition: Transition,
        error: Option<String>,
    },
    /// The session could not be read; nothing ran.
    StoreUnavailable(String),
}

impl DispatchOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, DispatchOutcome::Dropped)
    }

    pub fn handler(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Handled { handler, .. } => Some(handler),
            _ => None,
        }
    }

    pub fn transition(&self) -> Option<&Transition> {
        match self {
            DispatchOutcome::Handled { transition, .. } => Some(transition),
            _ => None,
        }
    }
}

/// Routes events to handlers. Cheap to clone; clones share the registry and the store.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    store: Arc<dyn ConversationStore>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, store: Arc<dyn ConversationStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Runs at most one handler for `event`.
    ///
    /// With an active session only the flow's exit handlers and the handlers of the current state are
    /// candidates; otherwise every top-level handler and flow entry is, in registration order.
    #[instrument(skip(self, event), fields(event_id = %event.id, user_id = event.sender.id, chat_id = event.chat.id))]
    pub async fn dispatch(&self, event: &Event) -> DispatchOutcome {
        let key = ConversationKey::from_event(event);
        let _guard = self.store.lock(&key).await;

        let session = match self.store.get(&key).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, key = %key, "Failed to read conversation");
                return DispatchOutcome::StoreUnavailable(e.to_string());
            }
        };

        if let Some(session) = session {
            match self.registry.flow(&session.flow) {
                Some(flow) => return self.dispatch_in_flow(&key, flow, &session, event).await,
                None => {
                    warn!(key = %key, flow = %session.flow, "Session refers to unknown flow, ending it");
                    if let Err(e) = self.store.end(&key).await {
                        error!(error = %e, key = %key, "Failed to end orphaned conversation");
                    }
                }
            }
        }

        self.dispatch_top_level(&key, event).await
    }

    async fn dispatch_in_flow(
        &self,
        key: &ConversationKey,
        flow: &Flow,
        session: &ConversationSession,
        event: &Event,
    ) -> DispatchOutcome {
        if let Some(exit) = flow.exit_for(event) {
            // Cancellation always terminates, whatever the action returned.
            let action_error = self.run(exit, event).await.err().map(|e| e.to_string());
            let (transition, store_error) = match self.store.end(key).await {
                Ok(()) => (Transition::Ended, None),
                Err(e) => {
                    error!(error = %e, key = %key, "Failed to end conversation on exit");
                    (Transition::None, Some(e.to_string()))
                }
            };
            info!(key = %key, flow = %flow.name(), handler = %exit.name(), "step: conversation exited");
            return DispatchOutcome::Handled {
                handler: exit.name().to_string(),
                transition,
                error: action_error.or(store_error),
            };
        }

        let Some(handler) = flow.state_handler_for(&session.state, event) else {
            debug!(
                key = %key,
                flow = %flow.name(),
                state = %session.state,
                "No handler for event in current state, dropped"
            );
            return DispatchOutcome::Dropped;
        };

        match self.run(handler, event).await {
            Ok(signal) => {
                let (transition, error) = self.apply_in_flow(key, flow, signal).await;
                DispatchOutcome::Handled {
                    handler: handler.name().to_string(),
                    transition,
                    error,
                }
            }
            // Session stays where it was so the user can retry.
            Err(e) => DispatchOutcome::Handled {
                handler: handler.name().to_string(),
                transition: Transition::None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn apply_in_flow(
        &self,
        key: &ConversationKey,
        flow: &Flow,
        signal: Signal,
    ) -> (Transition, Option<String>) {
        let result = match signal {
            Signal::Unchanged => return (Transition::None, None),
            Signal::Advance(state) => {
                if !flow.has_state(&state) {
                    warn!(flow = %flow.name(), state = %state, "Advancing to a state without handlers");
                }
                self.store
                    .advance(key, &state)
                    .await
                    .map(|()| Transition::Advanced { state })
            }
            Signal::End => self.store.end(key).await.map(|()| Transition::Ended),
        };
        match result {
            Ok(transition) => {
                info!(key = %key, flow = %flow.name(), transition = ?transition, "step: conversation updated");
                (transition, None)
            }
            Err(e) => {
                error!(error = %e, key = %key, flow = %flow.name(), "Failed to update conversation");
                (Transition::None, Some(e.to_string()))
            }
        }
    }

    async fn dispatch_top_level(&self, key: &ConversationKey, event: &Event) -> DispatchOutcome {
        for route in self.registry.routes() {
            match route {
                Route::Handler(handler) if handler.matches(event) => {
                    let error = match self.run(handler, event).await {
                        Ok(Signal::Unchanged) => None,
                        Ok(signal) => {
                            debug!(handler = %handler.name(), signal = ?signal, "Signal ignored outside a conversation");
                            None
                        }
                        Err(e) => Some(e.to_string()),
                    };
                    return DispatchOutcome::Handled {
                        handler: handler.name().to_string(),
                        transition: Transition::None,
                        error,
                    };
                }
                Route::Flow(flow) => {
                    if let Some(entry) = flow.entry_for(event) {
                        return self.enter_flow(key, flow, entry, event).await;
                    }
                }
                Route::Handler(_) => {}
            }
        }
        debug!(key = %key, kind = ?event.kind(), "No handler matched, dropped");
        DispatchOutcome::Dropped
    }

    async fn enter_flow(
        &self,
        key: &ConversationKey,
        flow: &Flow,
        entry: &HandlerBinding,
        event: &Event,
    ) -> DispatchOutcome {
        let (transition, error) = match self.run(entry, event).await {
            Ok(Signal::Advance(state)) => {
                if !flow.has_state(&state) {
                    warn!(flow = %flow.name(), state = %state, "Starting in a state without handlers");
                }
                match self.store.start(key, flow.name(), &state).await {
                    Ok(()) => {
                        info!(key = %key, flow = %flow.name(), state = %state, "step: conversation started");
                        (
                            Transition::Started {
                                flow: flow.name().to_string(),
                                state,
                            },
                            None,
                        )
                    }
                    Err(e) => {
                        error!(error = %e, key = %key, flow = %flow.name(), "Failed to start conversation");
                        (Transition::None, Some(e.to_string()))
                    }
                }
            }
            Ok(Signal::End) | Ok(Signal::Unchanged) => (Transition::None, None),
            Err(e) => (Transition::None, Some(e.to_string())),
        };
        DispatchOutcome::Handled {
            handler: entry.name().to_string(),
            transition,
            error,
        }
    }

    /// Invokes the handler's action, logging failures.
    async fn run(&self, handler: &HandlerBinding, event: &Event) -> Result<Signal, HandlerError> {
        info!(
            user_id = event.sender.id,
            chat_id = event.chat.id,
            handler = %handler.name(),
            "step: handler processing"
        );
        let result = handler.action().run(event).await;
        match &result {
            Ok(signal) => info!(handler = %handler.name(), signal = ?signal, "step: handler done"),
            Err(e) => error!(
                error = %e,
                user_id = event.sender.id,
                chat_id = event.chat.id,
                handler = %handler.name(),
                "Handler failed"
            ),
        }
        result
    }
}
