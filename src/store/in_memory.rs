use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::bus::Message;
use crate::entity::EventRecord;
use crate::inbox::InboxRecord;
use crate::outbox::OutboxRecord;

use super::error::StoreError;
use super::store::{
    Database, EventStore, InboxStore, OutboxSource, OutboxStore, SnapshotRecord, SnapshotStore,
    Transaction,
};

/// In-memory transactional database holding event streams, snapshots, the
/// outbox and the inbox.
///
/// Transactions buffer their writes and read their own writes. Commit takes the
/// write lock, re-checks every expected version and inbox key, then applies the
/// whole buffer or nothing.
///
/// Clone-friendly: clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<RwLock<DbState>>,
}

#[derive(Default)]
struct DbState {
    streams: HashMap<String, Vec<EventRecord>>,
    snapshots: HashMap<String, SnapshotRecord>,
    outbox: Vec<OutboxRecord>,
    inbox: HashMap<(String, String), InboxRecord>,
    next_sequence: u64,
    failing_commits: usize,
    offline: bool,
}

impl DbState {
    fn stream_version(&self, stream: &str) -> u64 {
        self.streams
            .get(stream)
            .and_then(|events| events.last())
            .map(|event| event.sequence)
            .unwrap_or(0)
    }
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DbState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::LockPoisoned("database read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DbState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::LockPoisoned("database write"))
    }

    fn inspect(&self) -> RwLockReadGuard<'_, DbState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `count` commits fail with [`StoreError::Unavailable`].
    pub fn fail_next_commits(&self, count: usize) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .failing_commits = count;
    }

    /// Simulate the database going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .offline = !available;
    }

    /// Committed events of `stream`.
    pub fn events(&self, stream: &str) -> Vec<EventRecord> {
        self.inspect()
            .streams
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }

    /// Latest committed snapshot of `stream`.
    pub fn snapshot(&self, stream: &str) -> Option<SnapshotRecord> {
        self.inspect().snapshots.get(stream).cloned()
    }

    /// All committed outbox rows, dispatched or not.
    pub fn outbox(&self) -> Vec<OutboxRecord> {
        self.inspect().outbox.clone()
    }

    /// All committed inbox rows.
    pub fn inbox(&self) -> Vec<InboxRecord> {
        let mut records: Vec<InboxRecord> = self.inspect().inbox.values().cloned().collect();
        records.sort_by(|a, b| a.processed_at.cmp(&b.processed_at));
        records
    }
}

impl Database for InMemoryDatabase {
    type Tx = InMemoryTransaction;

    fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        if self.read()?.offline {
            return Err(StoreError::Unavailable("database offline".into()));
        }
        Ok(InMemoryTransaction {
            db: self.clone(),
            pending: Mutex::new(Pending::default()),
            finished: AtomicBool::new(false),
        })
    }
}

impl OutboxSource for InMemoryDatabase {
    fn undispatched(&self, limit: usize) -> Result<Vec<OutboxRecord>, StoreError> {
        let state = self.read()?;
        if state.offline {
            return Err(StoreError::Unavailable("database offline".into()));
        }
        Ok(state
            .outbox
            .iter()
            .filter(|record| !record.is_dispatched())
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_dispatched(&self, sequence: u64) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let record = state
            .outbox
            .iter_mut()
            .find(|record| record.sequence == sequence)
            .ok_or(StoreError::UnknownOutboxRecord(sequence))?;
        record.dispatched_at = Some(SystemTime::now());
        Ok(())
    }
}

#[derive(Default)]
struct Pending {
    streams: BTreeMap<String, PendingStream>,
    snapshots: HashMap<String, SnapshotRecord>,
    outbox: Vec<(String, Message, SystemTime)>,
    inbox: Vec<(String, String)>,
}

struct PendingStream {
    expected: u64,
    events: Vec<EventRecord>,
}

impl PendingStream {
    fn version(&self) -> u64 {
        self.expected + self.events.len() as u64
    }
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.streams.is_empty()
            && self.snapshots.is_empty()
            && self.outbox.is_empty()
            && self.inbox.is_empty()
    }
}

/// A transaction on an [`InMemoryDatabase`].
pub struct InMemoryTransaction {
    db: InMemoryDatabase,
    pending: Mutex<Pending>,
    finished: AtomicBool,
}

impl InMemoryTransaction {
    fn pending(&self) -> Result<MutexGuard<'_, Pending>, StoreError> {
        if self.finished.load(Ordering::Acquire) {
            return Err(StoreError::Finished);
        }
        self.pending
            .lock()
            .map_err(|_| StoreError::LockPoisoned("transaction buffer"))
    }
}

impl EventStore for InMemoryTransaction {
    fn append_events(
        &self,
        stream: &str,
        expected_version: u64,
        events: &[EventRecord],
    ) -> Result<(), StoreError> {
        let mut pending = self.pending()?;

        let current = match pending.streams.get(stream) {
            Some(buffered) => buffered.version(),
            None => self.db.read()?.stream_version(stream),
        };
        if current != expected_version {
            return Err(StoreError::Conflict {
                stream: stream.to_string(),
                expected: expected_version,
                actual: current,
            });
        }

        for (offset, event) in events.iter().enumerate() {
            let sequence = expected_version + offset as u64 + 1;
            if event.sequence != sequence {
                return Err(StoreError::Conflict {
                    stream: stream.to_string(),
                    expected: sequence,
                    actual: event.sequence,
                });
            }
        }

        pending
            .streams
            .entry(stream.to_string())
            .or_insert_with(|| PendingStream {
                expected: expected_version,
                events: Vec::new(),
            })
            .events
            .extend_from_slice(events);
        Ok(())
    }

    fn read_events(
        &self,
        stream: &str,
        after_version: u64,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let pending = self.pending()?;
        let state = self.db.read()?;

        let mut events: Vec<EventRecord> = state
            .streams
            .get(stream)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.sequence > after_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(buffered) = pending.streams.get(stream) {
            events.extend(
                buffered
                    .events
                    .iter()
                    .filter(|event| event.sequence > after_version)
                    .cloned(),
            );
        }
        Ok(events)
    }
}

impl SnapshotStore for InMemoryTransaction {
    fn read_snapshot(&self, stream: &str) -> Result<Option<SnapshotRecord>, StoreError> {
        let pending = self.pending()?;
        if let Some(snapshot) = pending.snapshots.get(stream) {
            return Ok(Some(snapshot.clone()));
        }
        Ok(self.db.read()?.snapshots.get(stream).cloned())
    }

    fn write_snapshot(&self, record: SnapshotRecord) -> Result<(), StoreError> {
        let mut pending = self.pending()?;
        pending.snapshots.insert(record.stream_id.clone(), record);
        Ok(())
    }
}

impl OutboxStore for InMemoryTransaction {
    fn insert_outbox(&self, channel: &str, message: Message) -> Result<(), StoreError> {
        let mut pending = self.pending()?;
        pending
            .outbox
            .push((channel.to_string(), message, SystemTime::now()));
        Ok(())
    }
}

impl InboxStore for InMemoryTransaction {
    fn inbox_contains(&self, group: &str, message_id: &str) -> Result<bool, StoreError> {
        let pending = self.pending()?;
        if pending
            .inbox
            .iter()
            .any(|(g, id)| g == group && id == message_id)
        {
            return Ok(true);
        }
        Ok(self
            .db
            .read()?
            .inbox
            .contains_key(&(group.to_string(), message_id.to_string())))
    }

    fn insert_inbox(&self, group: &str, message_id: &str) -> Result<(), StoreError> {
        let mut pending = self.pending()?;
        if pending
            .inbox
            .iter()
            .any(|(g, id)| g == group && id == message_id)
        {
            return Err(StoreError::DuplicateInbox {
                group: group.to_string(),
                message_id: message_id.to_string(),
            });
        }
        pending
            .inbox
            .push((group.to_string(), message_id.to_string()));
        Ok(())
    }
}

impl Transaction for InMemoryTransaction {
    fn commit(&self) -> Result<(), StoreError> {
        let pending = std::mem::take(&mut *self.pending()?);
        self.finished.store(true, Ordering::Release);

        let mut state = self.db.write()?;

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            warn!("commit refused by injected failure");
            return Err(StoreError::Unavailable("commit failed".into()));
        }

        for (stream, buffered) in &pending.streams {
            let actual = state.stream_version(stream);
            if actual != buffered.expected {
                return Err(StoreError::Conflict {
                    stream: stream.clone(),
                    expected: buffered.expected,
                    actual,
                });
            }
        }
        for (group, message_id) in &pending.inbox {
            if state
                .inbox
                .contains_key(&(group.clone(), message_id.clone()))
            {
                return Err(StoreError::DuplicateInbox {
                    group: group.clone(),
                    message_id: message_id.clone(),
                });
            }
        }

        if pending.is_empty() {
            return Ok(());
        }

        let now = SystemTime::now();
        let appended: usize = pending.streams.values().map(|s| s.events.len()).sum();
        let queued = pending.outbox.len();

        for (stream, buffered) in pending.streams {
            state
                .streams
                .entry(stream)
                .or_default()
                .extend(buffered.events);
        }
        for (stream, snapshot) in pending.snapshots {
            state.snapshots.insert(stream, snapshot);
        }
        for (channel, message, created_at) in pending.outbox {
            state.next_sequence += 1;
            let sequence = state.next_sequence;
            state.outbox.push(OutboxRecord {
                sequence,
                channel,
                message,
                created_at,
                dispatched_at: None,
            });
        }
        for (group, message_id) in pending.inbox {
            state.inbox.insert(
                (group.clone(), message_id.clone()),
                InboxRecord {
                    group,
                    message_id,
                    processed_at: now,
                },
            );
        }

        debug!(events = appended, outbox = queued, "transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| StoreError::LockPoisoned("transaction buffer"))?;
        *pending = Pending::default();
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}
