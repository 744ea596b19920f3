//! # System Constants
//!
//! Channel names, query names and defaults shared by the correlation proxy,
//! the account actor and the gateway-facing client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Plan assigned to an account that is activated without one.
pub const DEFAULT_PLAN: &str = "trial";

/// Task queue the worker registers both actor kinds on.
pub const DEFAULT_TASK_QUEUE: &str = "interactive-ui-signal";

/// Interval between history compactions of a long-lived account actor.
pub const DEFAULT_COMPACTION_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// How long a correlation proxy waits for its reply by default.
pub const DEFAULT_PROXY_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Prefix of correlation proxy actor IDs. Each invocation appends a fresh UUID.
pub const PROXY_ID_PREFIX: &str = "request-response";

/// Query names answered by the account actor.
pub mod queries {
    pub const PLAN: &str = "plan";
    pub const ACCOUNT: &str = "account";
}

/// Runtime lifecycle events published on the `EventPublisher`.
pub mod events {
    pub const ACTOR_STARTED: &str = "actor.started";
    pub const ACTOR_CONTINUED_AS_NEW: &str = "actor.continued_as_new";
    pub const ACTOR_COMPLETED: &str = "actor.completed";
    pub const ACTOR_FAILED: &str = "actor.failed";
    pub const SIGNAL_DISPATCHED: &str = "signal.dispatched";
    pub const SIGNAL_DISPATCH_FAILED: &str = "signal.dispatch_failed";
}

/// Named signal channels.
///
/// Signal names are a closed set: the account actor listens on the two
/// command channels and the proxy listens on `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalChannel {
    #[serde(rename = "UpgradeAccountSignal")]
    UpgradeAccount,
    #[serde(rename = "DeleteAccountSignal")]
    DeleteAccount,
    #[serde(rename = "completed")]
    Completed,
}

impl SignalChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpgradeAccount => "UpgradeAccountSignal",
            Self::DeleteAccount => "DeleteAccountSignal",
            Self::Completed => "completed",
        }
    }

    /// Channels that carry commands for an account actor
    pub fn is_command(&self) -> bool {
        matches!(self, Self::UpgradeAccount | Self::DeleteAccount)
    }
}

impl fmt::Display for SignalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignalChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UpgradeAccountSignal" => Ok(Self::UpgradeAccount),
            "DeleteAccountSignal" => Ok(Self::DeleteAccount),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid signal channel: {s}")),
        }
    }
}
