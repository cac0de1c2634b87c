use std::collections::HashMap;
use std::time::SystemTime;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Error when encoding or decoding an event payload.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("payload error: {message}")]
pub struct PayloadError {
    pub message: String,
}

impl PayloadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One persisted domain event of an aggregate stream.
///
/// `sequence` is the aggregate version the event produced: the first event of a
/// stream has sequence 1 and sequences are gapless.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct EventRecord {
    pub event_name: String,
    #[serde(with = "payload_serde")]
    pub payload: Vec<u8>,
    pub sequence: u64,
    pub timestamp: SystemTime,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

mod payload_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(payload: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(payload).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

impl EventRecord {
    pub fn new(event_name: impl Into<String>, payload: Vec<u8>, sequence: u64) -> Self {
        EventRecord {
            event_name: event_name.into(),
            payload,
            sequence,
            timestamp: SystemTime::now(),
            metadata: HashMap::new(),
        }
    }

    /// Serialize `payload` with bitcode and build a record from it.
    pub fn encode<T: Serialize>(
        event_name: impl Into<String>,
        payload: &T,
        sequence: u64,
    ) -> Result<Self, PayloadError> {
        let bytes = bitcode::serialize(payload).map_err(|e| PayloadError::new(e.to_string()))?;
        Ok(Self::new(event_name, bytes, sequence))
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Deserialize the payload into the specified type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        bitcode::deserialize(&self.payload).map_err(|e| PayloadError::new(e.to_string()))
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.meta("correlation_id")
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.meta("causation_id")
    }
}
