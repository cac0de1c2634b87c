//! Messages carried by the broker.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Metadata key carrying the correlation ID of the originating request.
pub const CORRELATION_ID: &str = "correlation_id";
/// Metadata key carrying the ID of the message that caused this one.
pub const CAUSATION_ID: &str = "causation_id";
/// Metadata key naming the channel a command's reply is published to.
pub const REPLY_CHANNEL: &str = "reply_channel";

/// A message on the bus: a command, a reply, or an integration event.
///
/// `id` is deterministic for messages produced from domain events so that
/// redelivered copies deduplicate on the consumer side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub message_type: String,
    /// Serialized payload (JSON for integration messages).
    pub payload: Vec<u8>,
    #[serde(default)]
    pub metadata: Vec<(String, String)>,
}

impl Message {
    pub fn new(id: impl Into<String>, message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            message_type: message_type.into(),
            payload,
            metadata: Vec::new(),
        }
    }

    /// Create a message with a JSON payload.
    pub fn json<T: Serialize>(
        id: impl Into<String>,
        message_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, PublishError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| PublishError::SerializationFailed(e.to_string()))?;
        Ok(Self::new(id, message_type, bytes))
    }

    /// Decode a JSON payload.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Add (or replace) a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.metadata.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.metadata.push((key, value)),
        }
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Error type for broker operations.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    #[error("message rejected: {0}")]
    Rejected(String),
    #[error("publish timeout")]
    Timeout,
    #[error("publish error: {0}")]
    Other(String),
}

impl From<crate::entity::PayloadError> for PublishError {
    fn from(err: crate::entity::PayloadError) -> Self {
        PublishError::SerializationFailed(err.message)
    }
}
