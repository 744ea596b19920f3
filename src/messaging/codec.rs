//! Binary envelope codec.
//!
//! Envelopes travel between actors as opaque bytes. The encoding is JSON;
//! callers only depend on `encode_envelope`/`decode_envelope` being inverse.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

pub fn encode_envelope<T: Serialize>(envelope: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(envelope)?)
}

pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}
