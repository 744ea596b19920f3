use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Last evaluated answers to an actor's queries, keyed by query name.
///
/// Queries read this snapshot and never go through the actor's mailbox.
pub type QuerySnapshot = Arc<RwLock<HashMap<String, Value>>>;

type QueryFn<A> = Box<dyn Fn(&A) -> Value + Send + Sync>;

/// Read-only query handlers of one actor type
pub struct QueryRegistry<A> {
    handlers: Vec<(String, QueryFn<A>)>,
}

impl<A> QueryRegistry<A> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler. A later registration under the same name wins.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&A) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        self.handlers.retain(|(existing, _)| *existing != name);
        self.handlers.push((name, Box::new(handler)));
    }

    pub fn evaluate(&self, actor: &A) -> HashMap<String, Value> {
        self.handlers
            .iter()
            .map(|(name, handler)| (name.clone(), handler(actor)))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<A> Default for QueryRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for QueryRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
