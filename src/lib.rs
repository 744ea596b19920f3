#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Signal Bridge Core
//!
//! Request/response correlation over one-way signals, for long-lived
//! per-account actors running on a durable, replay-based substrate.
//!
//! ## Overview
//!
//! Signals between actors are fire-and-forget. A caller that needs an answer
//! starts a [`CorrelationProxy`](orchestration::CorrelationProxy): it forwards
//! the command with its own unique ID as the reply address and waits for
//! exactly one [`SignalResult`](messaging::SignalResult) on its `completed`
//! channel. The [`AccountActor`](orchestration::AccountActor) on the other
//! side authorizes the command, applies it, and replies to that address.
//!
//! ## Module Organization
//!
//! - [`substrate`] - Durable actor contract, history and replay, in-process runtime
//! - [`orchestration`] - Correlation proxy and account actor
//! - [`messaging`] - Payload, signal and result envelopes
//! - [`models`] - Account record and command bodies
//! - [`state_machine`] - Actor events and serializable phases
//! - [`client`] - Gateway-facing account operations
//! - [`registry`] - Worker-side actor kind registration
//! - [`config`] - Layered configuration
//! - [`events`] - Lifecycle event broadcasting
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use signalbridge_core::config::BridgeConfig;
//! use signalbridge_core::messaging::{Payload, PayloadData};
//! use signalbridge_core::models::{Account, UpgradeRequest};
//! use signalbridge_core::orchestration::{request_response, AccountActor};
//! use signalbridge_core::substrate::DurableRuntime;
//! use signalbridge_core::SignalChannel;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::default();
//! let runtime = DurableRuntime::from_config(&config);
//! runtime.spawn::<AccountActor>("a1", Account::new("a1"), config.account_settings())?;
//!
//! let body = PayloadData::raw_json(&UpgradeRequest {
//!     account: "a1".to_string(),
//!     to: "premium".to_string(),
//!     actor: "a1".to_string(),
//! })?;
//! let payload = Payload::new("a1", SignalChannel::UpgradeAccount, body);
//! let result = request_response(&runtime, payload, &config.proxy_settings()).await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod state_machine;
pub mod substrate;

pub use client::{AccountClient, ClientError};
pub use config::BridgeConfig;
pub use constants::SignalChannel;
pub use error::{
    ActorFailure, BridgeError, CodecError, DispatchError, ProxyError, QueryError, Result,
};
pub use messaging::{Payload, PayloadData, SignalData, SignalResult};
pub use models::{Account, DeleteAccountRequest, UpgradeRequest, UpgradeResponse};
pub use orchestration::{request_response, AccountActor, CorrelationProxy};
pub use substrate::{ActorId, DurableRuntime};
