//! # Signal Envelopes
//!
//! Wire-level types exchanged between a correlation proxy and its target:
//! the caller's `Payload`, the `SignalData` forwarded to the target, and the
//! `SignalResult` delivered back on the `completed` channel.

pub mod codec;
pub mod message;

pub use codec::{decode_envelope, encode_envelope};
pub use message::{Payload, PayloadData, PayloadType, SignalData, SignalResult, TypedEnvelope};
