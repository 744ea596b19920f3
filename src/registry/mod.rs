//! # Registry Infrastructure
//!
//! Worker-side registration of the actor kinds this crate provides.
//!
//! ```rust,no_run
//! use signalbridge_core::config::BridgeConfig;
//! use signalbridge_core::registry::register_worker;
//! use signalbridge_core::substrate::DurableRuntime;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::load()?;
//! let registry = register_worker(&config)?;
//! let runtime = DurableRuntime::from_config(&config);
//! registry.start(&runtime, "AccountWorkflow", "a1", json!({ "name": "a1" }))?;
//! # Ok(())
//! # }
//! ```

pub mod actor_type_registry;

pub use actor_type_registry::{ActorTypeRegistry, RegistryStats};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::orchestration::{AccountActor, CorrelationProxy};

/// Registry with both actor kinds registered on the configured task queue
pub fn register_worker(config: &BridgeConfig) -> Result<ActorTypeRegistry> {
    let registry = ActorTypeRegistry::new(config.task_queue.clone());
    registry.register::<AccountActor>(config.account_settings())?;
    registry.register::<CorrelationProxy>(config.proxy_settings())?;
    Ok(registry)
}
