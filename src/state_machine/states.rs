use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Account;
use crate::substrate::{SendId, TimerId};

/// Lifecycle of an account owned by an account actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    /// Accepting upgrade and delete commands
    #[default]
    Active,
    /// Deleted; the actor has completed
    Terminated,
}

impl AccountState {
    pub fn of(account: &Account) -> Self {
        if account.is_terminated() {
            Self::Terminated
        } else {
            Self::Active
        }
    }

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

impl std::str::FromStr for AccountState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "terminated" => Ok(Self::Terminated),
            _ => Err(format!("Invalid account state: {s}")),
        }
    }
}

/// Where an account actor's event loop is suspended
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AccountPhase {
    /// Waiting for a command or the compaction timer
    #[default]
    AwaitingEvent,
    /// A delete was accepted; waiting for the success reply to be acknowledged
    AwaitingDeleteAck {
        send_id: SendId,
        completion_target_id: String,
    },
}

impl AccountPhase {
    pub fn is_awaiting_ack(&self) -> bool {
        matches!(self, Self::AwaitingDeleteAck { .. })
    }
}

/// Where a correlation proxy is suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProxyPhase {
    /// The forwarded command has not been acknowledged yet
    Dispatching { send_id: SendId },
    /// Delivered; waiting on the completed channel
    AwaitingReply { timer_id: Option<TimerId> },
}

/// Externally visible lifecycle of an actor run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Running,
    ContinuedAsNew,
    Completed,
    Failed,
}

impl ActorStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::ContinuedAsNew => write!(f, "continued_as_new"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
