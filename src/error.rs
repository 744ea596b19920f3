//! Error types for the signal bridge.
//!
//! Two families live here. `BridgeError` is the crate-wide error for
//! configuration, registration and runtime plumbing. The remaining enums
//! describe the narrower failures of individual operations: dispatching a
//! signal, answering a query, encoding an envelope, or an actor run ending
//! without producing its output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Runtime error: {0}")]
    RuntimeError(String),
    #[error("Actor already running: {0}")]
    ActorAlreadyRunning(String),
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Query error: {0}")]
    Query(#[from] QueryError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl From<serde_json::Error> for BridgeError {
    fn from(error: serde_json::Error) -> Self {
        BridgeError::Codec(CodecError::from(error))
    }
}

impl From<config::ConfigError> for BridgeError {
    fn from(error: config::ConfigError) -> Self {
        BridgeError::ConfigurationError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure to hand a signal to its target actor.
///
/// This is the only failure the correlation proxy surfaces as a hard error;
/// it is never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DispatchError {
    #[error("actor not found: {actor_id}")]
    ActorNotFound { actor_id: String },
    #[error("actor {actor_id} is closed")]
    ActorClosed { actor_id: String },
    #[error("actor {actor_id} is running {current_run}, not requested run {requested_run}")]
    RunMismatch {
        actor_id: String,
        requested_run: String,
        current_run: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("actor not found: {actor_id}")]
    ActorNotFound { actor_id: String },
    #[error("actor {actor_id} has no query handler named {query}")]
    UnknownQuery { actor_id: String, query: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("payload is empty, expected {expected}")]
    EmptyPayload { expected: &'static str },
    #[error("typed envelope holds {actual}, expected {expected}")]
    TypeMismatch { expected: String, actual: String },
}

impl From<serde_json::Error> for CodecError {
    fn from(error: serde_json::Error) -> Self {
        CodecError::Serialization(error.to_string())
    }
}

/// Terminal failure of an actor run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorFailure {
    #[error("{0}")]
    Dispatch(DispatchError),
    #[error("no reply received within {timeout_ms}ms")]
    ReplyTimeout { timeout_ms: u64 },
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("replay diverged from history at sequence {sequence}: {detail}")]
    NonDeterministic { sequence: u64, detail: String },
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("actor run aborted: {0}")]
    Aborted(String),
}

impl From<DispatchError> for ActorFailure {
    fn from(error: DispatchError) -> Self {
        ActorFailure::Dispatch(error)
    }
}

/// What a caller of `request_response` sees when no `SignalResult` is produced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxyError {
    #[error("dispatch failed: {0}")]
    Dispatch(DispatchError),
    #[error("no reply received within {timeout_ms}ms")]
    ReplyTimeout { timeout_ms: u64 },
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("proxy run failed: {0}")]
    Runtime(String),
}

impl From<ActorFailure> for ProxyError {
    fn from(failure: ActorFailure) -> Self {
        match failure {
            ActorFailure::Dispatch(error) => ProxyError::Dispatch(error),
            ActorFailure::ReplyTimeout { timeout_ms } => ProxyError::ReplyTimeout { timeout_ms },
            ActorFailure::MalformedReply(detail) => ProxyError::MalformedReply(detail),
            other => ProxyError::Runtime(other.to_string()),
        }
    }
}

impl From<BridgeError> for ProxyError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Dispatch(error) => ProxyError::Dispatch(error),
            other => ProxyError::Runtime(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::ActorNotFound {
            actor_id: "a1".to_string(),
        };
        assert_eq!(err.to_string(), "actor not found: a1");

        let bridge: BridgeError = err.into();
        assert_eq!(bridge.to_string(), "Dispatch error: actor not found: a1");
    }

    #[test]
    fn test_serde_error_becomes_codec_error() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let bridge: BridgeError = err.into();
        assert!(matches!(
            bridge,
            BridgeError::Codec(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn test_actor_failure_wraps_dispatch_message() {
        let failure = ActorFailure::from(DispatchError::ActorClosed {
            actor_id: "a1".to_string(),
        });
        assert_eq!(failure.to_string(), "actor a1 is closed");
    }

    #[test]
    fn test_proxy_error_keeps_dispatch_failure() {
        let failure = ActorFailure::Dispatch(DispatchError::ActorNotFound {
            actor_id: "targetWorkflow".to_string(),
        });
        assert_eq!(
            ProxyError::from(failure),
            ProxyError::Dispatch(DispatchError::ActorNotFound {
                actor_id: "targetWorkflow".to_string(),
            })
        );
    }
}
