use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Marks a message as handled by a consumer group.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct InboxRecord {
    pub group: String,
    pub message_id: String,
    pub processed_at: SystemTime,
}
