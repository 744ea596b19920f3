//! # Actor Type Registry
//!
//! Worker-side registration of actor kinds. A registered kind can be started
//! by name from a JSON state, which is how a worker process hosts actors it
//! did not construct itself.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ActorFailure, BridgeError, Result};
use crate::substrate::{ActorHandle, ActorId, DurableActor, DurableRuntime};

type StartFn = Arc<dyn Fn(&DurableRuntime, ActorId, Value) -> Result<ActorHandle<Value>> + Send + Sync>;

/// Registry statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub task_queue: String,
    pub kinds: Vec<String>,
}

pub struct ActorTypeRegistry {
    task_queue: String,
    factories: DashMap<String, StartFn>,
}

impl std::fmt::Debug for ActorTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorTypeRegistry")
            .field("task_queue", &self.task_queue)
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ActorTypeRegistry {
    pub fn new(task_queue: impl Into<String>) -> Self {
        Self {
            task_queue: task_queue.into(),
            factories: DashMap::new(),
        }
    }

    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// Register `A` under its kind name with the settings every instance gets
    pub fn register<A>(&self, settings: A::Settings) -> Result<()>
    where
        A: DurableActor,
        A::Output: Serialize,
    {
        let kind = A::kind();
        if self.factories.contains_key(kind) {
            return Err(BridgeError::ValidationError(format!(
                "actor kind {kind} is already registered on {}",
                self.task_queue
            )));
        }

        let start: StartFn = Arc::new(move |runtime: &DurableRuntime, actor_id: ActorId, input: Value| {
            let state: A::State = serde_json::from_value(input).map_err(|e| {
                BridgeError::ValidationError(format!("invalid {kind} input: {e}"))
            })?;
            let handle = runtime.spawn::<A>(actor_id, state, settings.clone())?;
            Ok(handle.map_output(|output| {
                serde_json::to_value(output).map_err(|e| ActorFailure::Encoding(e.to_string()))
            }))
        });
        self.factories.insert(kind.to_string(), start);

        info!(kind = kind, task_queue = %self.task_queue, "Registered actor kind");
        Ok(())
    }

    /// Start a registered kind from its JSON state. Like
    /// `DurableRuntime::spawn`, this needs a running Tokio runtime.
    pub fn start(
        &self,
        runtime: &DurableRuntime,
        kind: &str,
        actor_id: impl Into<ActorId>,
        input: Value,
    ) -> Result<ActorHandle<Value>> {
        let start = self
            .factories
            .get(kind)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                BridgeError::ValidationError(format!(
                    "actor kind {kind} is not registered on {}",
                    self.task_queue
                ))
            })?;

        let actor_id = actor_id.into();
        debug!(kind = kind, actor_id = %actor_id, "Starting registered actor");
        start(runtime, actor_id, input)
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.iter().map(|entry| entry.key().clone()).collect();
        kinds.sort();
        kinds
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            task_queue: self.task_queue.clone(),
            kinds: self.kinds(),
        }
    }
}
