use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::{EventRecord, PayloadError};

/// Event-sourcing bookkeeping embedded in every aggregate.
///
/// Only events raised since the aggregate was loaded are held in memory;
/// history lives in the event store and is replayed through
/// [`Entity::replay`] during load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    id: String,
    version: u64,
    #[serde(skip, default)]
    committed_version: u64,
    snapshot_version: u64,
    #[serde(skip, default)]
    pending: Vec<EventRecord>,
    #[serde(skip, default)]
    replaying: bool,
    timestamp: SystemTime,
}

impl Default for Entity {
    fn default() -> Self {
        Entity {
            id: String::new(),
            version: 0,
            committed_version: 0,
            snapshot_version: 0,
            pending: Vec::new(),
            replaying: false,
            timestamp: SystemTime::now(),
        }
    }
}

struct ReplayGuard<'a> {
    replaying: &'a mut bool,
}

impl<'a> ReplayGuard<'a> {
    fn new(replaying: &'a mut bool) -> Self {
        *replaying = true;
        ReplayGuard { replaying }
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        *self.replaying = false;
    }
}

impl Entity {
    pub fn new() -> Self {
        Entity::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Entity {
            id: id.into(),
            ..Entity::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Version after the last recorded event, loaded or raised.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Version the aggregate had when it was loaded (or last saved).
    pub fn committed_version(&self) -> u64 {
        self.committed_version
    }

    pub fn snapshot_version(&self) -> u64 {
        self.snapshot_version
    }

    pub fn set_snapshot_version(&mut self, snapshot_version: u64) {
        self.snapshot_version = snapshot_version;
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Events raised since load, not yet persisted.
    pub fn new_events(&self) -> &[EventRecord] {
        &self.pending
    }

    /// Called by the repository once the pending events were appended.
    pub fn mark_committed(&mut self) {
        self.pending.clear();
        self.committed_version = self.version;
    }

    /// Record an event with a bitcode-serialized payload.
    ///
    /// A no-op while replaying.
    pub fn digest<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        payload: &T,
    ) -> Result<(), PayloadError> {
        if self.replaying {
            return Ok(());
        }

        let record = EventRecord::encode(name, payload, self.version + 1)?;
        self.version = record.sequence;
        self.timestamp = record.timestamp;
        self.pending.push(record);
        Ok(())
    }

    /// Restore from a snapshot taken at `version`. Nothing is pending afterwards.
    pub fn restore(&mut self, id: impl Into<String>, version: u64) {
        self.id = id.into();
        self.version = version;
        self.committed_version = version;
        self.snapshot_version = version;
        self.pending.clear();
    }

    /// Replay stored history on top of the current version.
    ///
    /// Each event must carry the next sequence number; a gap aborts replay.
    pub fn replay<F, E>(&mut self, history: &[EventRecord], mut apply: F) -> Result<(), E>
    where
        F: FnMut(&EventRecord) -> Result<(), E>,
        E: From<PayloadError>,
    {
        let mut version = self.version;
        {
            let _guard = ReplayGuard::new(&mut self.replaying);
            for event in history {
                if event.sequence != version + 1 {
                    return Err(E::from(PayloadError::new(format!(
                        "event sequence gap: expected {}, found {}",
                        version + 1,
                        event.sequence
                    ))));
                }
                apply(event)?;
                version = event.sequence;
            }
        }

        self.version = version;
        self.committed_version = version;
        if let Some(last) = history.last() {
            self.timestamp = last.timestamp;
        }
        Ok(())
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }
}
