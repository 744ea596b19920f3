//! Versioned, append-only history of an actor run, and deterministic replay.
//!
//! Each run starts with a `Started` checkpoint carrying the serialized state
//! it was activated from. Inputs (signals, timer firings, send
//! acknowledgements) are recorded together with the commands they produced.
//! Compaction drops everything and writes a fresh checkpoint under the next
//! generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

use super::actor::{ActorContext, Command, DurableActor, Step};
use super::ids::{ActorId, RunId, SendId, TimerId};
use crate::constants::SignalChannel;
use crate::error::ActorFailure;
use crate::state_machine::{ActorEvent, SendOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEventKind {
    Started {
        kind: String,
        run_id: RunId,
        state: Value,
    },
    SignalReceived {
        channel: SignalChannel,
        payload: Vec<u8>,
    },
    TimerStarted {
        timer_id: TimerId,
        after_ms: u64,
    },
    TimerFired {
        timer_id: TimerId,
    },
    SignalSent {
        send_id: SendId,
        target: ActorId,
        run_hint: Option<RunId>,
        channel: SignalChannel,
        payload: Vec<u8>,
    },
    SignalAcked {
        send_id: SendId,
        outcome: SendOutcome,
    },
    Completed,
    Failed {
        reason: String,
    },
}

impl HistoryEventKind {
    pub fn from_input(event: &ActorEvent) -> Self {
        match event {
            ActorEvent::Signal { channel, payload } => Self::SignalReceived {
                channel: *channel,
                payload: payload.clone(),
            },
            ActorEvent::TimerFired { timer_id } => Self::TimerFired {
                timer_id: *timer_id,
            },
            ActorEvent::SignalAcked { send_id, outcome } => Self::SignalAcked {
                send_id: *send_id,
                outcome: outcome.clone(),
            },
        }
    }

    pub fn from_command(command: &Command) -> Self {
        match command {
            Command::SignalExternal {
                send_id,
                target,
                run_hint,
                channel,
                payload,
            } => Self::SignalSent {
                send_id: *send_id,
                target: target.clone(),
                run_hint: *run_hint,
                channel: *channel,
                payload: payload.clone(),
            },
            Command::StartTimer { timer_id, after } => Self::TimerStarted {
                timer_id: *timer_id,
                after_ms: after.as_millis() as u64,
            },
        }
    }

    /// The input this entry records, if it records one
    pub fn as_input(&self) -> Option<ActorEvent> {
        match self {
            Self::SignalReceived { channel, payload } => Some(ActorEvent::Signal {
                channel: *channel,
                payload: payload.clone(),
            }),
            Self::TimerFired { timer_id } => Some(ActorEvent::TimerFired {
                timer_id: *timer_id,
            }),
            Self::SignalAcked { send_id, outcome } => Some(ActorEvent::SignalAcked {
                send_id: *send_id,
                outcome: outcome.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Self::SignalSent { .. } | Self::TimerStarted { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::SignalReceived { .. } => "signal_received",
            Self::TimerStarted { .. } => "timer_started",
            Self::TimerFired { .. } => "timer_fired",
            Self::SignalSent { .. } => "signal_sent",
            Self::SignalAcked { .. } => "signal_acked",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub kind: HistoryEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    generation: u64,
    next_sequence: u64,
    events: Vec<HistoryEvent>,
}

impl History {
    /// Open generation 1 with a `Started` checkpoint
    pub fn start(kind: &str, run_id: RunId, state: Value, at: DateTime<Utc>) -> Self {
        let mut history = Self {
            generation: 1,
            next_sequence: 1,
            events: Vec::new(),
        };
        history.append(
            at,
            HistoryEventKind::Started {
                kind: kind.to_string(),
                run_id,
                state,
            },
        );
        history
    }

    pub fn append(&mut self, at: DateTime<Utc>, kind: HistoryEventKind) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(HistoryEvent {
            sequence,
            recorded_at: at,
            kind,
        });
        sequence
    }

    /// Replace the log with a single checkpoint for a new run
    pub fn compact(&mut self, kind: &str, run_id: RunId, state: Value, at: DateTime<Utc>) {
        let dropped = self.events.len();
        self.generation += 1;
        self.next_sequence = 1;
        self.events.clear();
        self.append(
            at,
            HistoryEventKind::Started {
                kind: kind.to_string(),
                run_id,
                state,
            },
        );
        debug!(
            generation = self.generation,
            dropped_events = dropped,
            run_id = %run_id,
            "History compacted"
        );
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Run the current generation belongs to
    pub fn run_id(&self) -> Option<RunId> {
        match self.events.first().map(|event| &event.kind) {
            Some(HistoryEventKind::Started { run_id, .. }) => Some(*run_id),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(
            self.events.last().map(|event| &event.kind),
            Some(HistoryEventKind::Completed | HistoryEventKind::Failed { .. })
        )
    }
}

/// Rebuild an actor from the current generation of its history.
///
/// The actor is re-activated from the checkpoint and every recorded input is
/// fed back at its recorded timestamp. Any difference between the commands
/// replay produces and the ones that were recorded is reported as
/// `ActorFailure::NonDeterministic`.
pub fn replay<A: DurableActor>(
    actor_id: &ActorId,
    history: &History,
    settings: &A::Settings,
) -> Result<A, ActorFailure> {
    let mut events = history.events().iter();

    let first = events.next().ok_or_else(|| ActorFailure::NonDeterministic {
        sequence: 0,
        detail: "history is empty".to_string(),
    })?;
    let (kind, run_id, state) = match &first.kind {
        HistoryEventKind::Started {
            kind,
            run_id,
            state,
        } => (kind, *run_id, state),
        other => {
            return Err(ActorFailure::NonDeterministic {
                sequence: first.sequence,
                detail: format!("history starts with {} instead of started", other.name()),
            })
        }
    };
    if kind != A::kind() {
        return Err(ActorFailure::NonDeterministic {
            sequence: first.sequence,
            detail: format!("history belongs to {kind}, not {}", A::kind()),
        });
    }

    let state: A::State = serde_json::from_value(state.clone())
        .map_err(|e| ActorFailure::Encoding(format!("checkpoint state: {e}")))?;
    let mut cx = ActorContext::new(actor_id.clone(), run_id, first.recorded_at);
    let mut actor = A::activate(state, settings, &mut cx)?;
    let mut pending: VecDeque<Command> = cx.take_commands().into();
    let mut ended = false;

    for event in events {
        if ended {
            return Err(ActorFailure::NonDeterministic {
                sequence: event.sequence,
                detail: format!("{} recorded after the run ended", event.kind.name()),
            });
        }

        if event.kind.is_command() {
            let produced = pending.pop_front().ok_or_else(|| ActorFailure::NonDeterministic {
                sequence: event.sequence,
                detail: format!("recorded {} was not produced on replay", event.kind.name()),
            })?;
            let produced = HistoryEventKind::from_command(&produced);
            if produced != event.kind {
                return Err(ActorFailure::NonDeterministic {
                    sequence: event.sequence,
                    detail: format!(
                        "replay produced {} where {} was recorded",
                        produced.name(),
                        event.kind.name()
                    ),
                });
            }
            continue;
        }

        if let Some(input) = event.kind.as_input() {
            if let Some(unrecorded) = pending.front() {
                return Err(ActorFailure::NonDeterministic {
                    sequence: event.sequence,
                    detail: format!(
                        "replay produced unrecorded {}",
                        HistoryEventKind::from_command(unrecorded).name()
                    ),
                });
            }
            cx.begin(event.recorded_at);
            let step = actor.handle(input, &mut cx);
            pending.extend(cx.take_commands());
            ended = !matches!(step, Step::Continue);
            continue;
        }

        match &event.kind {
            HistoryEventKind::Completed | HistoryEventKind::Failed { .. } => ended = true,
            other => {
                return Err(ActorFailure::NonDeterministic {
                    sequence: event.sequence,
                    detail: format!("unexpected {} inside a run", other.name()),
                })
            }
        }
    }

    if let Some(unrecorded) = pending.front() {
        return Err(ActorFailure::NonDeterministic {
            sequence: history.events().last().map_or(0, |event| event.sequence),
            detail: format!(
                "replay produced unrecorded {}",
                HistoryEventKind::from_command(unrecorded).name()
            ),
        });
    }

    Ok(actor)
}
