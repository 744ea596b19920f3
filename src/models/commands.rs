//! Command and response bodies for the account actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SignalChannel;
use crate::error::CodecError;
use crate::messaging::{PayloadData, PayloadType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    /// Target account, used by gateways to address the actor
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub actor: String,
}

impl PayloadType for UpgradeRequest {
    const TYPE_URL: &'static str = "type.signalbridge/UpgradeRequest";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeResponse {
    pub valid_from: DateTime<Utc>,
}

impl PayloadType for UpgradeResponse {
    const TYPE_URL: &'static str = "type.signalbridge/UpgradeResponse";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAccountRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account: String,
    #[serde(default)]
    pub actor: String,
}

impl PayloadType for DeleteAccountRequest {
    const TYPE_URL: &'static str = "type.signalbridge/DeleteAccountRequest";
}

/// Commands an account actor reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCommand {
    Upgrade(UpgradeRequest),
    Delete(DeleteAccountRequest),
}

impl AccountCommand {
    /// Decode the command body delivered on `channel`
    pub fn decode(channel: SignalChannel, body: &PayloadData) -> Result<Self, CodecError> {
        match channel {
            SignalChannel::UpgradeAccount => Ok(Self::Upgrade(body.decode()?)),
            SignalChannel::DeleteAccount => Ok(Self::Delete(body.decode()?)),
            SignalChannel::Completed => Err(CodecError::TypeMismatch {
                expected: "account command".to_string(),
                actual: channel.to_string(),
            }),
        }
    }

    pub fn channel(&self) -> SignalChannel {
        match self {
            Self::Upgrade(_) => SignalChannel::UpgradeAccount,
            Self::Delete(_) => SignalChannel::DeleteAccount,
        }
    }

    /// Caller-claimed identity
    pub fn actor(&self) -> &str {
        match self {
            Self::Upgrade(request) => &request.actor,
            Self::Delete(request) => &request.actor,
        }
    }
}
