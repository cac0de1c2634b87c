use crate::bus::Message;
use crate::entity::EventRecord;
use crate::outbox::OutboxRecord;

use super::error::StoreError;

/// A stored snapshot: stream key, version at the time of the snapshot, and
/// bitcode-serialized state.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotRecord {
    pub stream_id: String,
    pub version: u64,
    pub data: Vec<u8>,
}

/// Append-only event streams with an expected-version precondition.
pub trait EventStore {
    /// Append `events` to `stream` if its latest version equals `expected_version`.
    ///
    /// `events` must carry sequences `expected_version + 1 ..` in order.
    fn append_events(
        &self,
        stream: &str,
        expected_version: u64,
        events: &[EventRecord],
    ) -> Result<(), StoreError>;

    /// Events of `stream` with a sequence greater than `after_version`, ascending.
    fn read_events(&self, stream: &str, after_version: u64)
        -> Result<Vec<EventRecord>, StoreError>;
}

/// One snapshot per stream (latest wins).
pub trait SnapshotStore {
    fn read_snapshot(&self, stream: &str) -> Result<Option<SnapshotRecord>, StoreError>;

    fn write_snapshot(&self, record: SnapshotRecord) -> Result<(), StoreError>;
}

/// Transactional outbox table.
pub trait OutboxStore {
    fn insert_outbox(&self, channel: &str, message: Message) -> Result<(), StoreError>;
}

/// Transactional inbox table keyed by (consumer group, message ID).
pub trait InboxStore {
    fn inbox_contains(&self, group: &str, message_id: &str) -> Result<bool, StoreError>;

    fn insert_inbox(&self, group: &str, message_id: &str) -> Result<(), StoreError>;
}

/// One open database transaction.
///
/// Every write goes through the same transaction; nothing is visible to other
/// transactions until [`Transaction::commit`] succeeds. Commit re-validates
/// expected versions and inbox uniqueness atomically.
pub trait Transaction: EventStore + SnapshotStore + OutboxStore + InboxStore + Send {
    fn commit(&self) -> Result<(), StoreError>;

    fn rollback(&self) -> Result<(), StoreError>;

    fn is_finished(&self) -> bool;
}

/// Begins transactions. Clones share the same underlying storage.
pub trait Database: Clone + Send + Sync + 'static {
    type Tx: Transaction;

    fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Read side of the outbox used by the processor. Sees committed rows only.
pub trait OutboxSource: Send + Sync {
    /// Up to `limit` undispatched rows in creation order.
    fn undispatched(&self, limit: usize) -> Result<Vec<OutboxRecord>, StoreError>;

    fn mark_dispatched(&self, sequence: u64) -> Result<(), StoreError>;
}
