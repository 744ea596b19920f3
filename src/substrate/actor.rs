//! The `DurableActor` contract and the context an actor issues commands through.
//!
//! Actors are plain synchronous state machines. Everything with a side effect
//! (sending a signal, starting a timer) is collected as a [`Command`] and
//! carried out by the runtime after the event that produced it has been
//! recorded. That split is what makes a run replayable from its history.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

use super::ids::{ActorId, RunId, SendId, TimerId};
use super::query::QueryRegistry;
use crate::constants::SignalChannel;
use crate::error::{ActorFailure, DispatchError};
use crate::state_machine::ActorEvent;

/// What the runtime should do with an actor after it handled an event
#[derive(Debug, Clone, PartialEq)]
pub enum Step<S, O> {
    /// Keep waiting for the next event
    Continue,
    /// Compact history and restart the same logical actor from `S`
    ContinueAsNew(S),
    /// End permanently with an output
    Complete(O),
    /// End permanently with a failure
    Fail(ActorFailure),
}

impl<S, O> Step<S, O> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Fail(_))
    }
}

pub trait DurableActor: Sized + Send + 'static {
    /// Serializable state handed to activation and to continuation
    type State: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Settings: Clone + Debug + Send + Sync + 'static;
    type Output: Debug + Send + 'static;

    /// Actor type name, as registered with a worker
    fn kind() -> &'static str;

    /// Build the actor for a new run. Commands issued here belong to the run.
    fn activate(
        state: Self::State,
        settings: &Self::Settings,
        cx: &mut ActorContext,
    ) -> Result<Self, ActorFailure>;

    fn handle(&mut self, event: ActorEvent, cx: &mut ActorContext) -> Step<Self::State, Self::Output>;

    fn register_queries(_queries: &mut QueryRegistry<Self>) {}

    /// Answer a signal still queued when the actor finished. `error` is what
    /// a sender arriving one moment later would have been told. The default
    /// drops the signal.
    fn reply_to_late_signal(
        _channel: SignalChannel,
        _payload: &[u8],
        _error: &DispatchError,
    ) -> Option<LateReply> {
        None
    }
}

/// Signal the runtime sends on behalf of an actor that has already finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateReply {
    pub target: ActorId,
    pub channel: SignalChannel,
    pub payload: Vec<u8>,
}

/// Side effect requested by an actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    SignalExternal {
        send_id: SendId,
        target: ActorId,
        run_hint: Option<RunId>,
        channel: SignalChannel,
        payload: Vec<u8>,
    },
    StartTimer {
        timer_id: TimerId,
        #[serde(with = "duration_ms")]
        after: Duration,
    },
}

/// Per-run view of the substrate handed to every activation and handler call
#[derive(Debug)]
pub struct ActorContext {
    actor_id: ActorId,
    run_id: RunId,
    now: DateTime<Utc>,
    next_timer: u64,
    next_send: u64,
    commands: Vec<Command>,
}

impl ActorContext {
    pub fn new(actor_id: ActorId, run_id: RunId, now: DateTime<Utc>) -> Self {
        Self {
            actor_id,
            run_id,
            now,
            next_timer: 1,
            next_send: 1,
            commands: Vec::new(),
        }
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Timestamp of the event being handled
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Signal the most recent run of `target` unless `run_hint` pins one.
    ///
    /// The outcome comes back as `ActorEvent::SignalAcked` carrying the
    /// returned `SendId`, ahead of any other pending input.
    pub fn signal_external(
        &mut self,
        target: ActorId,
        run_hint: Option<RunId>,
        channel: SignalChannel,
        payload: Vec<u8>,
    ) -> SendId {
        let send_id = SendId(self.next_send);
        self.next_send += 1;
        self.commands.push(Command::SignalExternal {
            send_id,
            target,
            run_hint,
            channel,
            payload,
        });
        send_id
    }

    /// Fire `ActorEvent::TimerFired` once after `after`
    pub fn start_timer(&mut self, after: Duration) -> TimerId {
        let timer_id = TimerId(self.next_timer);
        self.next_timer += 1;
        self.commands.push(Command::StartTimer { timer_id, after });
        timer_id
    }

    /// Move to the next event. Called by whatever drives the actor.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    /// Drain the commands issued since the last call
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
