//! # Account Demo
//!
//! Scripted walk through the account lifecycle: an upgrade attempted by the
//! wrong caller, an upgrade by the owner, then a delete. Configuration comes
//! from `SIGNALBRIDGE_*` variables (and `SIGNALBRIDGE_CONFIG_PATH`).

use anyhow::Context;
use signalbridge_core::client::{AccountClient, ClientError};
use signalbridge_core::config::BridgeConfig;
use signalbridge_core::logging::init_structured_logging;
use signalbridge_core::models::Account;
use signalbridge_core::substrate::DurableRuntime;
use tracing::{info, warn};

const ACCOUNT: &str = "account_1";
const INTRUDER: &str = "account_2";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = BridgeConfig::load().context("loading configuration")?;
    let client = AccountClient::new(DurableRuntime::from_config(&config), &config);

    let handle = client
        .create_account(Account::new(ACCOUNT))
        .context("creating account")?;
    let plan = client.plan(ACCOUNT)?;
    info!(account = ACCOUNT, plan = %plan, "Account created");

    match client.upgrade(ACCOUNT, "premium", INTRUDER).await {
        Err(ClientError::Rejected(reason)) => {
            info!(account = ACCOUNT, actor = INTRUDER, %reason, "Upgrade rejected as expected")
        }
        Ok(response) => warn!(valid_from = %response.valid_from, "Upgrade by another account was accepted"),
        Err(e) => return Err(e).context("upgrade by another account"),
    }

    let response = client
        .upgrade(ACCOUNT, "premium", ACCOUNT)
        .await
        .context("upgrade by owner")?;
    let plan = client.plan(ACCOUNT)?;
    info!(
        account = ACCOUNT,
        plan = %plan,
        valid_from = %response.valid_from,
        "Upgrade accepted"
    );

    client
        .delete(ACCOUNT, ACCOUNT)
        .await
        .context("delete by owner")?;

    let account = handle.result().await.context("waiting for account actor")?;
    info!(
        account = %account.name,
        plan = %account.plan,
        created = ?account.created,
        terminated = ?account.terminated,
        "Account actor finished"
    );

    Ok(())
}
