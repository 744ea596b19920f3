use serde::{Deserialize, Serialize};

use crate::constants::SignalChannel;
use crate::error::DispatchError;
use crate::substrate::{SendId, TimerId};

/// Inputs delivered to a durable actor, one at a time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ActorEvent {
    /// A signal arrived on a named channel
    Signal {
        channel: SignalChannel,
        payload: Vec<u8>,
    },
    /// A timer started by this run fired
    TimerFired { timer_id: TimerId },
    /// The runtime finished delivering a signal this run sent
    SignalAcked {
        send_id: SendId,
        outcome: SendOutcome,
    },
}

impl ActorEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Signal { .. } => "signal",
            Self::TimerFired { .. } => "timer_fired",
            Self::SignalAcked { .. } => "signal_acked",
        }
    }

    pub fn channel(&self) -> Option<SignalChannel> {
        match self {
            Self::Signal { channel, .. } => Some(*channel),
            _ => None,
        }
    }
}

/// Delivery outcome of an outbound signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SendOutcome {
    Delivered,
    Failed(DispatchError),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Delivered => None,
        }
    }
}

impl From<Result<(), DispatchError>> for SendOutcome {
    fn from(result: Result<(), DispatchError>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(error) => Self::Failed(error),
        }
    }
}
