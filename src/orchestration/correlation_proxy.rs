//! # Correlation Proxy
//!
//! Turns a one-way signal into a request/response exchange. Every call runs
//! a fresh proxy actor under a unique ID; that ID travels with the forwarded
//! command as its reply address, so replies to concurrent requests against
//! the same target can never be crossed.
//!
//! Dispatch failure is the one outcome that is not folded into a
//! `SignalResult`: it fails the proxy run and surfaces as
//! `ProxyError::Dispatch`. It is never retried.

use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{SignalChannel, PROXY_ID_PREFIX};
use crate::error::{ActorFailure, ProxyError};
use crate::messaging::{decode_envelope, encode_envelope, Payload, SignalData, SignalResult};
use crate::state_machine::{ActorEvent, ProxyPhase, SendOutcome};
use crate::substrate::{ActorContext, ActorId, DurableActor, DurableRuntime, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    /// `None` waits for the reply indefinitely
    pub reply_timeout: Option<Duration>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            reply_timeout: Some(crate::constants::DEFAULT_PROXY_REPLY_TIMEOUT),
        }
    }
}

#[derive(Debug)]
pub struct CorrelationProxy {
    request: Payload,
    phase: ProxyPhase,
    reply_timeout: Option<Duration>,
}

impl CorrelationProxy {
    pub fn request(&self) -> &Payload {
        &self.request
    }

    pub fn phase(&self) -> ProxyPhase {
        self.phase
    }

    fn timeout_failure(&self) -> ActorFailure {
        ActorFailure::ReplyTimeout {
            timeout_ms: self.reply_timeout.map_or(0, |t| t.as_millis() as u64),
        }
    }
}

impl DurableActor for CorrelationProxy {
    type State = Payload;
    type Settings = ProxySettings;
    type Output = SignalResult;

    fn kind() -> &'static str {
        "RequestResponse"
    }

    fn activate(
        request: Payload,
        settings: &ProxySettings,
        cx: &mut ActorContext,
    ) -> Result<Self, ActorFailure> {
        let envelope = SignalData {
            payload_data: request.payload_data.clone(),
            completion_target_id: cx.actor_id().to_string(),
        };
        let bytes =
            encode_envelope(&envelope).map_err(|e| ActorFailure::Encoding(e.to_string()))?;

        let send_id = cx.signal_external(
            ActorId::from(request.target_id.as_str()),
            None,
            request.signal,
            bytes,
        );
        debug!(
            proxy_id = %cx.actor_id(),
            target = %request.target_id,
            signal = %request.signal,
            "Forwarding request"
        );

        Ok(Self {
            request,
            phase: ProxyPhase::Dispatching { send_id },
            reply_timeout: settings.reply_timeout,
        })
    }

    fn handle(&mut self, event: ActorEvent, cx: &mut ActorContext) -> Step<Payload, SignalResult> {
        match (self.phase, event) {
            (
                ProxyPhase::Dispatching { send_id },
                ActorEvent::SignalAcked {
                    send_id: acked,
                    outcome,
                },
            ) if acked == send_id => match outcome {
                SendOutcome::Failed(error) => Step::Fail(ActorFailure::Dispatch(error)),
                SendOutcome::Delivered => {
                    let timer_id = self.reply_timeout.map(|timeout| cx.start_timer(timeout));
                    self.phase = ProxyPhase::AwaitingReply { timer_id };
                    Step::Continue
                }
            },
            (
                _,
                ActorEvent::Signal {
                    channel: SignalChannel::Completed,
                    payload,
                },
            ) => match decode_envelope::<SignalResult>(&payload) {
                Ok(result) => Step::Complete(result),
                Err(e) => Step::Fail(ActorFailure::MalformedReply(e.to_string())),
            },
            (
                ProxyPhase::AwaitingReply {
                    timer_id: Some(armed),
                },
                ActorEvent::TimerFired { timer_id },
            ) if armed == timer_id => Step::Fail(self.timeout_failure()),
            (phase, other) => {
                warn!(
                    proxy_id = %cx.actor_id(),
                    ?phase,
                    event = other.event_type(),
                    "Ignoring unexpected event"
                );
                Step::Continue
            }
        }
    }
}

/// Forward `payload` to its target and wait for exactly one reply
pub async fn request_response(
    runtime: &DurableRuntime,
    payload: Payload,
    settings: &ProxySettings,
) -> Result<SignalResult, ProxyError> {
    let proxy_id = ActorId::unique(PROXY_ID_PREFIX);
    let handle = runtime.spawn::<CorrelationProxy>(proxy_id, payload, settings.clone())?;
    Ok(handle.result().await?)
}
