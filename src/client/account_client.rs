use thiserror::Error;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::constants::{queries, SignalChannel};
use crate::error::{BridgeError, CodecError, ProxyError, QueryError};
use crate::messaging::{Payload, PayloadData, SignalResult};
use crate::models::{Account, DeleteAccountRequest, UpgradeRequest, UpgradeResponse};
use crate::orchestration::{request_response, AccountActor, AccountSettings, ProxySettings};
use crate::substrate::{ActorDescription, ActorHandle, ActorId, DurableActor, DurableRuntime};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The account actor answered with an error result
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Runtime(#[from] BridgeError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone)]
pub struct AccountClient {
    runtime: DurableRuntime,
    account_settings: AccountSettings,
    proxy_settings: ProxySettings,
}

impl AccountClient {
    pub fn new(runtime: DurableRuntime, config: &BridgeConfig) -> Self {
        Self {
            runtime,
            account_settings: config.account_settings(),
            proxy_settings: config.proxy_settings(),
        }
    }

    pub fn with_settings(
        runtime: DurableRuntime,
        account_settings: AccountSettings,
        proxy_settings: ProxySettings,
    ) -> Self {
        Self {
            runtime,
            account_settings,
            proxy_settings,
        }
    }

    pub fn runtime(&self) -> &DurableRuntime {
        &self.runtime
    }

    /// Start the actor for `account`, addressed by the account name.
    /// Must be called from within a Tokio runtime.
    pub fn create_account(&self, account: Account) -> Result<ActorHandle<Account>, ClientError> {
        if account.name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "account name is required".to_string(),
            ));
        }

        let actor_id = ActorId::from(account.name.as_str());
        let handle = self
            .runtime
            .spawn::<AccountActor>(actor_id, account, self.account_settings.clone())?;
        info!(account = %handle.actor_id(), "Account created");
        Ok(handle)
    }

    /// Forward any payload through a correlation proxy and return the raw reply
    pub async fn send(&self, payload: Payload) -> Result<SignalResult, ProxyError> {
        request_response(&self.runtime, payload, &self.proxy_settings).await
    }

    pub async fn upgrade(
        &self,
        account: &str,
        to: &str,
        actor: &str,
    ) -> Result<UpgradeResponse, ClientError> {
        require("account", account)?;
        require("plan", to)?;

        let body = PayloadData::raw_json(&UpgradeRequest {
            account: account.to_string(),
            to: to.to_string(),
            actor: actor.to_string(),
        })?;
        let result = self
            .send(Payload::new(account, SignalChannel::UpgradeAccount, body))
            .await?;
        let result = accepted(result)?;

        let response: UpgradeResponse = result.payload_data.decode()?;
        debug!(account = account, valid_from = %response.valid_from, "Upgrade accepted");
        Ok(response)
    }

    pub async fn delete(&self, account: &str, actor: &str) -> Result<(), ClientError> {
        require("account", account)?;

        let body = PayloadData::raw_json(&DeleteAccountRequest {
            account: account.to_string(),
            actor: actor.to_string(),
        })?;
        let result = self
            .send(Payload::new(account, SignalChannel::DeleteAccount, body))
            .await?;
        accepted(result)?;
        debug!(account = account, "Delete accepted");
        Ok(())
    }

    pub fn plan(&self, account: &str) -> Result<String, ClientError> {
        let answer = self
            .runtime
            .query(&ActorId::from(account), queries::PLAN)?;
        Ok(serde_json::from_value(answer).map_err(CodecError::from)?)
    }

    pub fn account(&self, account: &str) -> Result<Account, ClientError> {
        let answer = self
            .runtime
            .query(&ActorId::from(account), queries::ACCOUNT)?;
        Ok(serde_json::from_value(answer).map_err(CodecError::from)?)
    }

    pub fn list_accounts(&self) -> Vec<ActorDescription> {
        self.runtime.list(Some(AccountActor::kind()))
    }
}

fn require(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        Err(ClientError::InvalidRequest(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn accepted(result: SignalResult) -> Result<SignalResult, ClientError> {
    if let Some(message) = result.error_message() {
        return Err(ClientError::Rejected(message.to_string()));
    }
    if !result.success {
        return Err(ClientError::Rejected("request was not successful".to_string()));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AccountClient {
        AccountClient::new(DurableRuntime::new(), &BridgeConfig::default())
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let err = client().create_account(Account::new("  ")).unwrap_err();
        assert_eq!(
            err,
            ClientError::InvalidRequest("account name is required".to_string())
        );
    }

    #[test]
    fn test_create_outside_tokio_runtime_is_a_runtime_error() {
        let err = client().create_account(Account::new("a1")).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Runtime(BridgeError::RuntimeError(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_account_is_a_runtime_error() {
        let client = client();
        client.create_account(Account::new("a1")).unwrap();
        assert!(matches!(
            client.create_account(Account::new("a1")),
            Err(ClientError::Runtime(BridgeError::ActorAlreadyRunning(_)))
        ));
    }

    #[tokio::test]
    async fn test_upgrade_requires_target_plan() {
        let err = client().upgrade("a1", "", "a1").await.unwrap_err();
        assert_eq!(err, ClientError::InvalidRequest("plan is required".to_string()));
    }

    #[tokio::test]
    async fn test_list_only_shows_accounts() {
        let client = client();
        client.create_account(Account::new("b")).unwrap();
        client.create_account(Account::new("a")).unwrap();

        let names: Vec<String> = client
            .list_accounts()
            .into_iter()
            .map(|description| description.actor_id.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_failed_result_is_rejected() {
        let err = accepted(SignalResult::failure("access denied to account from a2")).unwrap_err();
        assert_eq!(
            err,
            ClientError::Rejected("access denied to account from a2".to_string())
        );
        assert!(accepted(SignalResult::success(PayloadData::Empty)).is_ok());
    }
}
