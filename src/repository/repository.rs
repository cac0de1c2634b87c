use std::marker::PhantomData;

use tracing::debug;

use crate::aggregate::{hydrate, stream_id, Snapshottable};
use crate::entity::PayloadError;
use crate::router::DomainEvent;
use crate::store::{EventStore, SnapshotRecord, SnapshotStore, Transaction};
use crate::uow::Scope;

use super::error::RepositoryError;

/// Event-sourced repository for one aggregate type, bound to a scope.
///
/// Loads from the latest snapshot plus newer events, saves only the events
/// raised since load with an expected-version check, and hands every saved
/// event to the scope's domain-event router so translated integration events
/// land in the same transaction's outbox.
pub struct AggregateRepository<'s, T: Transaction, A> {
    scope: &'s Scope<T>,
    _marker: PhantomData<A>,
}

impl<'s, T: Transaction, A: Snapshottable> AggregateRepository<'s, T, A> {
    pub(crate) fn new(scope: &'s Scope<T>) -> Self {
        Self {
            scope,
            _marker: PhantomData,
        }
    }

    /// Load an aggregate. Fails with `NotFound` when it has no history.
    pub fn load(&self, id: &str) -> Result<A, RepositoryError> {
        let tx = self.scope.transaction();
        let stream = stream_id::<A>(id);

        let mut aggregate = A::new_empty();
        let snapshot = tx.read_snapshot(&stream)?;
        let after = match &snapshot {
            Some(record) => {
                let state: A::Snapshot = bitcode::deserialize(&record.data)
                    .map_err(|e| RepositoryError::Replay(format!("snapshot deserialize: {e}")))?;
                aggregate.restore_from_snapshot(state);
                aggregate.entity_mut().restore(id, record.version);
                record.version
            }
            None => {
                aggregate.entity_mut().set_id(id);
                0
            }
        };

        let history = tx.read_events(&stream, after)?;
        if snapshot.is_none() && history.is_empty() {
            return Err(RepositoryError::NotFound {
                aggregate_type: A::TYPE_NAME,
                id: id.to_string(),
            });
        }

        hydrate(&mut aggregate, &history).map_err(RepositoryError::Replay)?;
        debug!(
            stream = %stream,
            version = aggregate.version(),
            from_snapshot = snapshot.is_some(),
            replayed = history.len(),
            "aggregate loaded"
        );
        Ok(aggregate)
    }

    /// Whether any history exists for `id`.
    pub fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        let tx = self.scope.transaction();
        let stream = stream_id::<A>(id);
        if tx.read_snapshot(&stream)?.is_some() {
            return Ok(true);
        }
        Ok(!tx.read_events(&stream, 0)?.is_empty())
    }

    /// Append the aggregate's new events, publish their translations to the
    /// outbox, and snapshot when the frequency threshold is reached.
    ///
    /// Nothing is durable until the scope commits.
    pub fn save(&self, aggregate: &mut A) -> Result<(), RepositoryError> {
        let events = aggregate.entity().new_events().to_vec();
        if events.is_empty() {
            return Ok(());
        }

        let id = aggregate.id().to_string();
        let stream = stream_id::<A>(&id);
        let expected = aggregate.entity().committed_version();
        self.scope
            .transaction()
            .append_events(&stream, expected, &events)?;

        let publisher = self.scope.publisher();
        for record in &events {
            let event = DomainEvent::new(A::TYPE_NAME, &id, record);
            self.scope.domain_events().dispatch(&event, &publisher)?;
        }

        aggregate.entity_mut().mark_committed();
        self.maybe_snapshot(aggregate, stream)?;
        debug!(aggregate_id = %id, appended = events.len(), version = aggregate.version(), "aggregate saved");
        Ok(())
    }

    fn maybe_snapshot(&self, aggregate: &mut A, stream: String) -> Result<(), RepositoryError> {
        let frequency = self.scope.snapshot_frequency();
        if frequency == 0 {
            return Ok(());
        }

        let version = aggregate.version();
        if version < aggregate.entity().snapshot_version() + frequency {
            return Ok(());
        }

        let data = bitcode::serialize(&aggregate.create_snapshot())
            .map_err(|e| PayloadError::new(format!("snapshot serialize: {e}")))?;
        self.scope.transaction().write_snapshot(SnapshotRecord {
            stream_id: stream,
            version,
            data,
        })?;
        aggregate.entity_mut().set_snapshot_version(version);
        Ok(())
    }
}
