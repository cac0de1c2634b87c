//! Transactional storage: event streams, snapshots, outbox and inbox behind
//! one transaction handle.

mod error;
mod in_memory;
mod store;

pub use error::StoreError;
pub use in_memory::{InMemoryDatabase, InMemoryTransaction};
pub use store::{
    Database, EventStore, InboxStore, OutboxSource, OutboxStore, SnapshotRecord, SnapshotStore,
    Transaction,
};
