//! Value codecs for the `val` column.
//!
//! A codec turns a [`serde_json::Value`] into the bytes stored in a row and
//! back. The built-in registry is [`Serializer`]; anything else can be plugged
//! in through [`Codec`] when a store is built.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Codec failure. Never surfaced by the store, only logged.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Serializer/deserializer pair for stored values.
///
/// `decode(encode(v))` must reproduce `v` for every value the codec accepts.
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// JSON text payloads via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Compact MessagePack payloads via rmp-serde.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackCodec;

impl Codec for MessagePackCodec {
    fn name(&self) -> &str {
        "messagepack"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Built-in codec selector, settable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Serializer {
    #[default]
    Json,
    #[serde(alias = "msgpack")]
    MessagePack,
}

impl Serializer {
    /// Resolve the selector to a codec instance.
    pub fn codec(self) -> Arc<dyn Codec> {
        match self {
            Serializer::Json => Arc::new(JsonCodec),
            Serializer::MessagePack => Arc::new(MessagePackCodec),
        }
    }
}
