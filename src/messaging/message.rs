//! # Envelope Structures
//!
//! `PayloadData` carries an opaque command or response body in exactly one
//! representation: raw bytes, or a typed envelope that names the type of the
//! bytes it holds.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::SignalChannel;
use crate::error::CodecError;

/// Body types that can be carried inside a typed envelope
pub trait PayloadType {
    const TYPE_URL: &'static str;
}

/// Self-describing body: a type tag plus the encoded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedEnvelope {
    pub type_url: String,
    pub value: Vec<u8>,
}

/// Opaque command or response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PayloadData {
    #[default]
    Empty,
    Raw(Vec<u8>),
    Typed(TypedEnvelope),
}

impl PayloadData {
    /// Encode `body` as raw JSON bytes
    pub fn raw_json<T: Serialize>(body: &T) -> Result<Self, CodecError> {
        Ok(Self::Raw(serde_json::to_vec(body)?))
    }

    /// Encode `body` into a typed envelope tagged with its type URL
    pub fn typed_json<T: Serialize + PayloadType>(body: &T) -> Result<Self, CodecError> {
        Ok(Self::Typed(TypedEnvelope {
            type_url: T::TYPE_URL.to_string(),
            value: serde_json::to_vec(body)?,
        }))
    }

    /// Decode the body as `T`, whichever representation carries it
    pub fn decode<T: DeserializeOwned + PayloadType>(&self) -> Result<T, CodecError> {
        match self {
            Self::Empty => Err(CodecError::EmptyPayload {
                expected: T::TYPE_URL,
            }),
            Self::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
            Self::Typed(envelope) => {
                if envelope.type_url != T::TYPE_URL {
                    return Err(CodecError::TypeMismatch {
                        expected: T::TYPE_URL.to_string(),
                        actual: envelope.type_url.clone(),
                    });
                }
                Ok(serde_json::from_slice(&envelope.value)?)
            }
        }
    }

    /// Raw bytes of the body, as relayed to HTTP callers
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Empty => None,
            Self::Raw(bytes) => Some(bytes),
            Self::Typed(envelope) => Some(&envelope.value),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Caller-constructed request consumed by a correlation proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub payload_data: PayloadData,
    pub target_id: String,
    pub signal: SignalChannel,
}

impl Payload {
    pub fn new(target_id: impl Into<String>, signal: SignalChannel, payload_data: PayloadData) -> Self {
        Self {
            payload_data,
            target_id: target_id.into(),
            signal,
        }
    }
}

/// Envelope forwarded to the target, carrying the proxy's reply address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalData {
    pub payload_data: PayloadData,
    pub completion_target_id: String,
}

/// Reply delivered exactly once to the waiting proxy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResult {
    pub payload_data: PayloadData,
    pub success: bool,
    pub error: Option<String>,
}

impl SignalResult {
    pub fn success(payload_data: PayloadData) -> Self {
        Self {
            payload_data,
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            payload_data: PayloadData::Empty,
            success: false,
            error: Some(error.into()),
        }
    }

    /// The error text, if the target reported one
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }
}
