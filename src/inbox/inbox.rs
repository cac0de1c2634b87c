use crate::store::{InboxStore, StoreError};

/// Inbox rows of one consumer group inside the current transaction.
pub struct Inbox<'a, T: InboxStore> {
    tx: &'a T,
    group: &'a str,
}

impl<'a, T: InboxStore> Inbox<'a, T> {
    pub fn new(tx: &'a T, group: &'a str) -> Self {
        Self { tx, group }
    }

    pub fn group(&self) -> &str {
        self.group
    }

    /// Whether `message_id` was already handled by this group.
    pub fn contains(&self, message_id: &str) -> Result<bool, StoreError> {
        self.tx.inbox_contains(self.group, message_id)
    }

    /// Record `message_id` as handled. Becomes durable with the transaction.
    pub fn mark(&self, message_id: &str) -> Result<(), StoreError> {
        self.tx.insert_inbox(self.group, message_id)
    }
}
