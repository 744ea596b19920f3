//! # Account Client
//!
//! Gateway-facing operations on account actors. Commands go through a fresh
//! correlation proxy per call; reads go through queries and never touch an
//! actor's mailbox.
//!
//! ```rust,no_run
//! use signalbridge_core::client::AccountClient;
//! use signalbridge_core::config::BridgeConfig;
//! use signalbridge_core::models::Account;
//! use signalbridge_core::substrate::DurableRuntime;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::default();
//! let client = AccountClient::new(DurableRuntime::from_config(&config), &config);
//!
//! client.create_account(Account::new("a1"))?;
//! let response = client.upgrade("a1", "premium", "a1").await?;
//! assert_eq!(client.plan("a1")?, "premium");
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod account_client;

pub use account_client::{AccountClient, ClientError};
