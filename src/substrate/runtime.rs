//! In-process durable runtime.
//!
//! One tokio task drives each logical actor. The task owns the actor value
//! and its context and processes one event at a time: send acknowledgements
//! produced by the actor's own commands first, then the mailbox. The mailbox
//! belongs to the logical actor, so it survives continue-as-new untouched and
//! signals buffered across a compaction are neither lost nor replayed twice.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::actor::{ActorContext, Command, DurableActor, Step};
use super::clock::{Clock, SystemClock};
use super::history::{History, HistoryEventKind};
use super::ids::{ActorId, RunId, TimerId};
use super::query::{QueryRegistry, QuerySnapshot};
use crate::config::BridgeConfig;
use crate::constants::{events, SignalChannel};
use crate::error::{ActorFailure, BridgeError, DispatchError, QueryError, Result};
use crate::events::EventPublisher;
use crate::logging::{log_actor_operation, log_signal_operation};
use crate::state_machine::{ActorEvent, ActorStatus, SendOutcome};

#[derive(Debug)]
enum Inbound {
    Signal {
        channel: SignalChannel,
        payload: Vec<u8>,
    },
    Timer {
        run_id: RunId,
        timer_id: TimerId,
    },
}

struct ActorSlot {
    kind: &'static str,
    run_id: RunId,
    mailbox: mpsc::UnboundedSender<Inbound>,
    queries: QuerySnapshot,
    history: Arc<Mutex<History>>,
    started_at: DateTime<Utc>,
}

struct RuntimeInner {
    actors: DashMap<ActorId, ActorSlot>,
    clock: Arc<dyn Clock>,
    publisher: EventPublisher,
}

/// Point-in-time description of a running actor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorDescription {
    pub actor_id: ActorId,
    pub kind: String,
    pub run_id: RunId,
    pub status: ActorStatus,
    pub history_length: usize,
    pub generation: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DurableRuntime {
    inner: Arc<RuntimeInner>,
}

impl std::fmt::Debug for DurableRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableRuntime")
            .field("actors", &self.inner.actors.len())
            .field("clock", &self.inner.clock)
            .finish()
    }
}

impl Default for DurableRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableRuntime {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), EventPublisher::default())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(clock, EventPublisher::default())
    }

    pub fn with_publisher(publisher: EventPublisher) -> Self {
        Self::with_parts(Arc::new(SystemClock), publisher)
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::with_publisher(EventPublisher::new(config.event_channel_capacity))
    }

    pub fn with_parts(clock: Arc<dyn Clock>, publisher: EventPublisher) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                actors: DashMap::new(),
                clock,
                publisher,
            }),
        }
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.inner.publisher
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Activate a new actor under `actor_id` and start driving it.
    ///
    /// Activation runs before this returns, so queries answer immediately.
    /// Fails with `ActorAlreadyRunning` if the ID is taken. The driver runs
    /// on the current Tokio runtime, so calling this outside one is a
    /// `RuntimeError`.
    pub fn spawn<A: DurableActor>(
        &self,
        actor_id: impl Into<ActorId>,
        state: A::State,
        settings: A::Settings,
    ) -> Result<ActorHandle<A::Output>> {
        let actor_id = actor_id.into();
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(BridgeError::RuntimeError(format!(
                "cannot spawn {} {actor_id}: no Tokio runtime is running",
                A::kind()
            )));
        }
        let entry = match self.inner.actors.entry(actor_id.clone()) {
            Entry::Occupied(_) => {
                return Err(BridgeError::ActorAlreadyRunning(actor_id.to_string()));
            }
            Entry::Vacant(entry) => entry,
        };

        let run_id = RunId::new();
        let now = self.inner.clock.now();
        let checkpoint = serde_json::to_value(&state)?;
        let mut cx = ActorContext::new(actor_id.clone(), run_id, now);
        let actor = A::activate(state, &settings, &mut cx).map_err(|failure| {
            BridgeError::RuntimeError(format!("{} {actor_id} failed to activate: {failure}", A::kind()))
        })?;
        let initial = cx.take_commands();

        let mut history = History::start(A::kind(), run_id, checkpoint, now);
        for command in &initial {
            history.append(now, HistoryEventKind::from_command(command));
        }
        let history = Arc::new(Mutex::new(history));

        let mut queries = QueryRegistry::new();
        A::register_queries(&mut queries);
        let snapshot: QuerySnapshot = Arc::new(RwLock::new(queries.evaluate(&actor)));

        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        entry.insert(ActorSlot {
            kind: A::kind(),
            run_id,
            mailbox: mailbox_tx.clone(),
            queries: snapshot.clone(),
            history: history.clone(),
            started_at: now,
        });

        let (completion_tx, completion_rx) = oneshot::channel();
        let driver = Driver {
            runtime: self.clone(),
            actor_id: actor_id.clone(),
            actor,
            settings,
            cx,
            queries,
            snapshot,
            history,
            mailbox: mailbox_rx,
            self_tx: mailbox_tx,
            acks: VecDeque::new(),
            timers: HashMap::new(),
            completion: Some(completion_tx),
        };

        log_actor_operation("spawn", actor_id.as_str(), A::kind(), Some(&run_id.to_string()), None);
        self.publish(
            events::ACTOR_STARTED,
            json!({ "actor_id": actor_id, "kind": A::kind(), "run_id": run_id }),
        );

        tokio::spawn(driver.run(initial));

        Ok(ActorHandle {
            actor_id,
            run_id,
            completion: completion_rx,
        })
    }

    /// Deliver a signal to the current run of `target`.
    ///
    /// A `run_hint` that no longer names the current run is rejected.
    pub fn signal(
        &self,
        target: &ActorId,
        run_hint: Option<RunId>,
        channel: SignalChannel,
        payload: Vec<u8>,
    ) -> std::result::Result<(), DispatchError> {
        let result = self.deliver(target, run_hint, channel, payload);

        match &result {
            Ok(()) => {
                log_signal_operation("signal", target.as_str(), channel.as_str(), "delivered", None);
                self.publish(
                    events::SIGNAL_DISPATCHED,
                    json!({ "target": target, "channel": channel }),
                );
            }
            Err(error) => {
                log_signal_operation(
                    "signal",
                    target.as_str(),
                    channel.as_str(),
                    "failed",
                    Some(&error.to_string()),
                );
                self.publish(
                    events::SIGNAL_DISPATCH_FAILED,
                    json!({ "target": target, "channel": channel, "error": error.to_string() }),
                );
            }
        }

        result
    }

    fn deliver(
        &self,
        target: &ActorId,
        run_hint: Option<RunId>,
        channel: SignalChannel,
        payload: Vec<u8>,
    ) -> std::result::Result<(), DispatchError> {
        let slot = self
            .inner
            .actors
            .get(target)
            .ok_or_else(|| DispatchError::ActorNotFound {
                actor_id: target.to_string(),
            })?;

        if let Some(requested) = run_hint {
            if requested != slot.run_id {
                return Err(DispatchError::RunMismatch {
                    actor_id: target.to_string(),
                    requested_run: requested.to_string(),
                    current_run: slot.run_id.to_string(),
                });
            }
        }

        slot.mailbox
            .send(Inbound::Signal { channel, payload })
            .map_err(|_| DispatchError::ActorClosed {
                actor_id: target.to_string(),
            })
    }

    /// Answer a named query from the actor's latest snapshot
    pub fn query(&self, actor_id: &ActorId, name: &str) -> std::result::Result<Value, QueryError> {
        let slot = self
            .inner
            .actors
            .get(actor_id)
            .ok_or_else(|| QueryError::ActorNotFound {
                actor_id: actor_id.to_string(),
            })?;

        let answers = slot.queries.read();
        answers
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownQuery {
                actor_id: actor_id.to_string(),
                query: name.to_string(),
            })
    }

    pub fn is_running(&self, actor_id: &ActorId) -> bool {
        self.inner.actors.contains_key(actor_id)
    }

    pub fn describe(&self, actor_id: &ActorId) -> Option<ActorDescription> {
        self.inner
            .actors
            .get(actor_id)
            .map(|slot| describe_slot(actor_id, &slot))
    }

    /// Running actors, optionally restricted to one kind, ordered by ID
    pub fn list(&self, kind: Option<&str>) -> Vec<ActorDescription> {
        let mut descriptions: Vec<ActorDescription> = self
            .inner
            .actors
            .iter()
            .filter(|slot| kind.map_or(true, |kind| slot.kind == kind))
            .map(|slot| describe_slot(slot.key(), slot.value()))
            .collect();
        descriptions.sort_by(|a, b| a.actor_id.cmp(&b.actor_id));
        descriptions
    }

    /// Copy of the current history generation of a running actor
    pub fn history(&self, actor_id: &ActorId) -> Option<History> {
        self.inner
            .actors
            .get(actor_id)
            .map(|slot| slot.history.lock().clone())
    }

    fn publish(&self, name: &str, context: Value) {
        self.inner.publisher.publish(name, context);
    }
}

fn describe_slot(actor_id: &ActorId, slot: &ActorSlot) -> ActorDescription {
    let history = slot.history.lock();
    ActorDescription {
        actor_id: actor_id.clone(),
        kind: slot.kind.to_string(),
        run_id: slot.run_id,
        status: ActorStatus::Running,
        history_length: history.len(),
        generation: history.generation(),
        started_at: slot.started_at,
    }
}

/// Awaitable outcome of a spawned actor
#[derive(Debug)]
pub struct ActorHandle<O> {
    actor_id: ActorId,
    run_id: RunId,
    completion: oneshot::Receiver<std::result::Result<O, ActorFailure>>,
}

impl<O: Send + 'static> ActorHandle<O> {
    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// The run the actor was spawned with
    pub fn first_run_id(&self) -> RunId {
        self.run_id
    }

    /// Wait for the actor to complete or fail
    pub async fn result(self) -> std::result::Result<O, ActorFailure> {
        match self.completion.await {
            Ok(result) => result,
            Err(_) => Err(ActorFailure::Aborted(format!(
                "driver for {} stopped without a result",
                self.actor_id
            ))),
        }
    }

    /// Convert the eventual output without waiting for it
    pub fn map_output<U, F>(self, f: F) -> ActorHandle<U>
    where
        U: Send + 'static,
        F: FnOnce(O) -> std::result::Result<U, ActorFailure> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let actor_id = self.actor_id.clone();
        let run_id = self.run_id;
        tokio::spawn(async move {
            let mapped = self.result().await.and_then(f);
            let _ = tx.send(mapped);
        });
        ActorHandle {
            actor_id,
            run_id,
            completion: rx,
        }
    }
}

struct Driver<A: DurableActor> {
    runtime: DurableRuntime,
    actor_id: ActorId,
    actor: A,
    settings: A::Settings,
    cx: ActorContext,
    queries: QueryRegistry<A>,
    snapshot: QuerySnapshot,
    history: Arc<Mutex<History>>,
    mailbox: mpsc::UnboundedReceiver<Inbound>,
    self_tx: mpsc::UnboundedSender<Inbound>,
    acks: VecDeque<ActorEvent>,
    timers: HashMap<TimerId, JoinHandle<()>>,
    completion: Option<oneshot::Sender<std::result::Result<A::Output, ActorFailure>>>,
}

impl<A: DurableActor> Driver<A> {
    async fn run(mut self, initial: Vec<Command>) {
        self.execute(initial);

        loop {
            let event = match self.acks.pop_front() {
                Some(ack) => ack,
                None => match self.mailbox.recv().await {
                    Some(Inbound::Signal { channel, payload }) => {
                        ActorEvent::Signal { channel, payload }
                    }
                    Some(Inbound::Timer { run_id, timer_id }) => {
                        if run_id != self.cx.run_id() {
                            debug!(actor_id = %self.actor_id, %run_id, %timer_id, "Dropping timer from a previous run");
                            continue;
                        }
                        self.timers.remove(&timer_id);
                        ActorEvent::TimerFired { timer_id }
                    }
                    None => {
                        self.finish(Err(ActorFailure::Aborted("mailbox closed".to_string())));
                        return;
                    }
                },
            };

            let now = self.runtime.now();
            self.cx.begin(now);
            debug!(
                actor_id = %self.actor_id,
                run_id = %self.cx.run_id(),
                event = event.event_type(),
                "Handling event"
            );
            let step = self.actor.handle(event.clone(), &mut self.cx);
            let commands = self.cx.take_commands();
            {
                let mut history = self.history.lock();
                history.append(now, HistoryEventKind::from_input(&event));
                for command in &commands {
                    history.append(now, HistoryEventKind::from_command(command));
                }
            }
            self.refresh_queries();
            self.execute(commands);

            match step {
                Step::Continue => {}
                Step::ContinueAsNew(state) => {
                    if let Err(failure) = self.continue_as_new(state) {
                        self.finish(Err(failure));
                        return;
                    }
                }
                Step::Complete(output) => {
                    self.finish(Ok(output));
                    return;
                }
                Step::Fail(failure) => {
                    self.finish(Err(failure));
                    return;
                }
            }
        }
    }

    fn refresh_queries(&self) {
        if !self.queries.is_empty() {
            *self.snapshot.write() = self.queries.evaluate(&self.actor);
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::SignalExternal {
                    send_id,
                    target,
                    run_hint,
                    channel,
                    payload,
                } => {
                    let outcome =
                        SendOutcome::from(self.runtime.signal(&target, run_hint, channel, payload));
                    if let SendOutcome::Failed(error) = &outcome {
                        warn!(
                            actor_id = %self.actor_id,
                            target = %target,
                            %send_id,
                            error = %error,
                            "Outbound signal was not delivered"
                        );
                    }
                    self.acks
                        .push_back(ActorEvent::SignalAcked { send_id, outcome });
                }
                Command::StartTimer { timer_id, after } => {
                    let mailbox = self.self_tx.clone();
                    let run_id = self.cx.run_id();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = mailbox.send(Inbound::Timer { run_id, timer_id });
                    });
                    self.timers.insert(timer_id, handle);
                }
            }
        }
    }

    fn cancel_timers(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }

    fn continue_as_new(&mut self, state: A::State) -> std::result::Result<(), ActorFailure> {
        self.cancel_timers();
        if !self.acks.is_empty() {
            debug!(actor_id = %self.actor_id, discarded = self.acks.len(), "Discarding acknowledgements of the previous run");
            self.acks.clear();
        }

        let previous_run = self.cx.run_id();
        let run_id = RunId::new();
        let now = self.runtime.now();
        let checkpoint = serde_json::to_value(&state)
            .map_err(|e| ActorFailure::Encoding(format!("continuation state: {e}")))?;

        let mut cx = ActorContext::new(self.actor_id.clone(), run_id, now);
        let actor = A::activate(state, &self.settings, &mut cx)?;
        let commands = cx.take_commands();
        {
            let mut history = self.history.lock();
            history.compact(A::kind(), run_id, checkpoint, now);
            for command in &commands {
                history.append(now, HistoryEventKind::from_command(command));
            }
        }

        self.actor = actor;
        self.cx = cx;
        if let Some(mut slot) = self.runtime.inner.actors.get_mut(&self.actor_id) {
            slot.run_id = run_id;
        }
        self.refresh_queries();

        info!(
            actor_id = %self.actor_id,
            previous_run = %previous_run,
            run_id = %run_id,
            "Continued as new"
        );
        self.runtime.publish(
            events::ACTOR_CONTINUED_AS_NEW,
            json!({
                "actor_id": self.actor_id,
                "kind": A::kind(),
                "previous_run_id": previous_run,
                "run_id": run_id,
                "status": ActorStatus::ContinuedAsNew,
            }),
        );

        self.execute(commands);
        Ok(())
    }

    fn finish(&mut self, result: std::result::Result<A::Output, ActorFailure>) {
        self.cancel_timers();
        self.runtime.inner.actors.remove(&self.actor_id);

        self.mailbox.close();
        let gone = DispatchError::ActorNotFound {
            actor_id: self.actor_id.to_string(),
        };
        let mut dropped = 0usize;
        while let Ok(inbound) = self.mailbox.try_recv() {
            let Inbound::Signal { channel, payload } = inbound else {
                continue;
            };
            match A::reply_to_late_signal(channel, &payload, &gone) {
                Some(reply) => {
                    debug!(
                        actor_id = %self.actor_id,
                        signal = %channel,
                        reply_to = %reply.target,
                        "Answering signal that arrived after the final event"
                    );
                    // Failures are logged by `signal`
                    let _ = self
                        .runtime
                        .signal(&reply.target, None, reply.channel, reply.payload);
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(actor_id = %self.actor_id, dropped, "Dropping signals that arrived after the final event");
        }

        let now = self.runtime.now();
        let run_id = self.cx.run_id().to_string();
        let (status, kind) = match &result {
            Ok(_) => (ActorStatus::Completed, HistoryEventKind::Completed),
            Err(failure) => (
                ActorStatus::Failed,
                HistoryEventKind::Failed {
                    reason: failure.to_string(),
                },
            ),
        };
        self.history.lock().append(now, kind);

        match &result {
            Ok(output) => {
                log_actor_operation(
                    "complete",
                    self.actor_id.as_str(),
                    A::kind(),
                    Some(&run_id),
                    Some(&format!("{output:?}")),
                );
                self.runtime.publish(
                    events::ACTOR_COMPLETED,
                    json!({ "actor_id": self.actor_id, "kind": A::kind(), "run_id": run_id, "status": status }),
                );
            }
            Err(failure) => {
                warn!(actor_id = %self.actor_id, kind = A::kind(), run_id = %run_id, error = %failure, "Actor run failed");
                self.runtime.publish(
                    events::ACTOR_FAILED,
                    json!({
                        "actor_id": self.actor_id,
                        "kind": A::kind(),
                        "run_id": run_id,
                        "status": status,
                        "error": failure.to_string(),
                    }),
                );
            }
        }

        if let Some(completion) = self.completion.take() {
            if completion.send(result).is_err() {
                debug!(actor_id = %self.actor_id, "Actor handle dropped before completion");
            }
        }
    }
}
