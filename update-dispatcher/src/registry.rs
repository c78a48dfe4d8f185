//! Handler registry: ordered top-level handlers and named conversation flows.
//!
//! The registry is assembled once through [`RegistryBuilder`] and is immutable afterwards. Matching is a
//! linear scan in registration order; the first matching handler wins, there is no priority or specificity.

use crate::action::Action;
use crate::error::DispatchError;
use crate::filter::Filter;
use budget_core::Event;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A (filter, action) pair with a name used in logs.
#[derive(Clone)]
pub struct HandlerBinding {
    name: String,
    filter: Filter,
    action: Arc<dyn Action>,
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("name", &self.name)
            .finish()
    }
}

impl HandlerBinding {
    pub fn new(name: impl Into<String>, filter: Filter, action: Arc<dyn Action>) -> Self {
        Self {
            name: name.into(),
            filter,
            action,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.filter.matches(event)
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }
}

/// Static definition of a multi-step conversation.
#[derive(Debug)]
pub struct Flow {
    name: String,
    entries: Vec<HandlerBinding>,
    states: HashMap<String, Vec<HandlerBinding>>,
    exits: Vec<HandlerBinding>,
}

impl Flow {
    pub fn builder(name: impl Into<String>) -> FlowBuilder {
        FlowBuilder {
            name: name.into(),
            entries: Vec::new(),
            states: HashMap::new(),
            exits: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First entry handler matching the event.
    pub fn entry_for(&self, event: &Event) -> Option<&HandlerBinding> {
        self.entries.iter().find(|h| h.matches(event))
    }

    /// First exit handler matching the event.
    pub fn exit_for(&self, event: &Event) -> Option<&HandlerBinding> {
        self.exits.iter().find(|h| h.matches(event))
    }

    /// First handler registered under `state` matching the event.
    pub fn state_handler_for(&self, state: &str, event: &Event) -> Option<&HandlerBinding> {
        self.states
            .get(state)
            .and_then(|handlers| handlers.iter().find(|h| h.matches(event)))
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }
}

/// Builder for [`Flow`]. Handlers keep the order they are added in.
pub struct FlowBuilder {
    name: String,
    entries: Vec<HandlerBinding>,
    states: HashMap<String, Vec<HandlerBinding>>,
    exits: Vec<HandlerBinding>,
}

impl FlowBuilder {
    /// Adds a handler that may start the conversation.
    pub fn entry(mut self, handler: HandlerBinding) -> Self {
        self.entries.push(handler);
        self
    }

    /// Adds a handler valid while the conversation is in `state`.
    pub fn state(mut self, state: impl Into<String>, handler: HandlerBinding) -> Self {
        self.states.entry(state.into()).or_default().push(handler);
        self
    }

    /// Adds a handler valid in every state; the conversation always ends after it runs.
    pub fn exit(mut self, handler: HandlerBinding) -> Self {
        self.exits.push(handler);
        self
    }

    pub fn build(self) -> Result<Flow, DispatchError> {
        if self.entries.is_empty() {
            return Err(DispatchError::EmptyFlow(self.name));
        }
        Ok(Flow {
            name: self.name,
            entries: self.entries,
            states: self.states,
            exits: self.exits,
        })
    }
}

/// One slot of the top-level scan.
#[derive(Debug, Clone)]
pub enum Route {
    Handler(HandlerBinding),
    Flow(Arc<Flow>),
}

/// Immutable, ordered set of routes shared by the dispatcher.
#[derive(Debug)]
pub struct HandlerRegistry {
    routes: Vec<Route>,
    flows: HashMap<String, Arc<Flow>>,
}

impl HandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder { routes: Vec::new() }
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn flow(&self, name: &str) -> Option<&Arc<Flow>> {
        self.flows.get(name)
    }
}

/// Builder for [`HandlerRegistry`]; routes are scanned in the order they are added.
pub struct RegistryBuilder {
    routes: Vec<Route>,
}

impl RegistryBuilder {
    /// Appends a top-level handler.
    pub fn add_handler(mut self, handler: HandlerBinding) -> Self {
        self.routes.push(Route::Handler(handler));
        self
    }

    /// Appends a flow; its entry handlers compete with top-level handlers at this position.
    pub fn add_flow(mut self, flow: Flow) -> Self {
        self.routes.push(Route::Flow(Arc::new(flow)));
        self
    }

    pub fn build(self) -> Result<HandlerRegistry, DispatchError> {
        let mut flows = HashMap::new();
        for route in &self.routes {
            if let Route::Flow(flow) = route {
                if flows.insert(flow.name().to_string(), flow.clone()).is_some() {
                    return Err(DispatchError::DuplicateFlow(flow.name().to_string()));
                }
            }
        }
        Ok(HandlerRegistry {
            routes: self.routes,
            flows,
        })
    }
}
