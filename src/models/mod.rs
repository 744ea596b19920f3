//! # Domain Models
//!
//! The account record owned by an account actor and the command bodies
//! exchanged with it through the correlation proxy.

pub mod account;
pub mod commands;

pub use account::{Account, AuthorizationError};
pub use commands::{AccountCommand, DeleteAccountRequest, UpgradeRequest, UpgradeResponse};
