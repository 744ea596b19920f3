//! # Durable Execution Substrate
//!
//! The interface the correlation proxy and the account actor are written
//! against, plus an in-process implementation of it.
//!
//! | Substrate operation                        | Here                                   |
//! |--------------------------------------------|----------------------------------------|
//! | `sendSignal(actorID, runHint, name, data)` | [`ActorContext::signal_external`], acknowledged as `ActorEvent::SignalAcked` |
//! | `receiveSignal(channel)`                   | `ActorEvent::Signal` delivered to [`DurableActor::handle`] |
//! | `startTimer(duration)`                     | [`ActorContext::start_timer`], fires `ActorEvent::TimerFired` |
//! | `now()`                                    | [`ActorContext::now`], the recorded time of the event being handled |
//! | `continueIdentity(entryPoint, state)`      | returning [`Step::ContinueAsNew`]      |
//! | `registerQueryHandler(name, fn)`           | [`DurableActor::register_queries`]     |
//!
//! Actors never block. Every suspension point is an explicit, serializable
//! phase held by the actor value, and every input is recorded in a versioned
//! [`History`] that [`replay`] can rebuild the actor from.

pub mod actor;
pub mod clock;
pub mod history;
pub mod ids;
pub mod query;
pub mod runtime;

pub use actor::{ActorContext, Command, DurableActor, LateReply, Step};
pub use clock::{Clock, ManualClock, SystemClock};
pub use history::{replay, History, HistoryEvent, HistoryEventKind};
pub use ids::{ActorId, RunId, SendId, TimerId};
pub use query::{QueryRegistry, QuerySnapshot};
pub use runtime::{ActorDescription, ActorHandle, DurableRuntime};
