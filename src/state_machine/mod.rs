// State machine vocabulary shared by the durable actors
//
// Events are the only inputs an actor reacts to. They are recorded in the
// actor's history before any of the commands they produce take effect, which
// is what lets a run be replayed deterministically.

pub mod events;
pub mod states;

pub use events::{ActorEvent, SendOutcome};
pub use states::{AccountPhase, AccountState, ActorStatus, ProxyPhase};
