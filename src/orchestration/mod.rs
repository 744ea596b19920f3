//! # Orchestration
//!
//! The two actors built on the durable substrate: the short-lived
//! [`CorrelationProxy`] that gives callers request/response semantics over
//! one-way signals, and the long-lived [`AccountActor`] that owns one
//! account's state.

pub mod account_actor;
pub mod correlation_proxy;

pub use account_actor::{AccountActor, AccountSettings};
pub use correlation_proxy::{request_response, CorrelationProxy, ProxySettings};
