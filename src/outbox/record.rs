use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::bus::Message;

/// A message waiting in (or already drained from) the transactional outbox.
///
/// `sequence` is assigned at commit and orders rows by creation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OutboxRecord {
    pub sequence: u64,
    pub channel: String,
    pub message: Message,
    pub created_at: SystemTime,
    pub dispatched_at: Option<SystemTime>,
}

impl OutboxRecord {
    pub fn is_dispatched(&self) -> bool {
        self.dispatched_at.is_some()
    }

    pub fn message_id(&self) -> &str {
        &self.message.id
    }

    pub fn message_type(&self) -> &str {
        &self.message.message_type
    }
}
