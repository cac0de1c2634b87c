use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::aggregate::Snapshottable;
use crate::inbox::Inbox;
use crate::outbox::OutboxWriter;
use crate::repository::AggregateRepository;
use crate::router::DomainEventRouter;
use crate::store::Transaction;

use super::context::RequestContext;
use super::error::UowError;

/// Everything one request needs, bound to one open transaction.
///
/// Obtained from [`UnitOfWork::begin`](super::UnitOfWork::begin) and finished
/// with [`Scope::close`]. A scope dropped without `close` (early return or
/// unwinding panic) rolls its transaction back.
pub struct Scope<T: Transaction> {
    tx: T,
    domain_events: Arc<DomainEventRouter>,
    context: RequestContext,
    snapshot_frequency: u64,
    closed: bool,
}

impl<T: Transaction> Scope<T> {
    pub(crate) fn new(
        tx: T,
        domain_events: Arc<DomainEventRouter>,
        context: RequestContext,
        snapshot_frequency: u64,
    ) -> Self {
        Self {
            tx,
            domain_events,
            context,
            snapshot_frequency,
            closed: false,
        }
    }

    /// Event-sourced repository for `A` writing through this scope's transaction.
    pub fn repository<A: Snapshottable>(&self) -> AggregateRepository<'_, T, A> {
        AggregateRepository::new(self)
    }

    /// Publisher that writes to the outbox inside this scope's transaction.
    pub fn publisher(&self) -> OutboxWriter<'_, T> {
        OutboxWriter::new(&self.tx, &self.context)
    }

    /// Inbox for consumer `group` inside this scope's transaction.
    pub fn inbox<'a>(&'a self, group: &'a str) -> Inbox<'a, T> {
        Inbox::new(&self.tx, group)
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn transaction(&self) -> &T {
        &self.tx
    }

    pub fn domain_events(&self) -> &DomainEventRouter {
        &self.domain_events
    }

    pub fn snapshot_frequency(&self) -> u64 {
        self.snapshot_frequency
    }

    /// Fail fast once the caller's deadline has passed.
    pub fn check_deadline(&self) -> Result<(), UowError> {
        if self.context.is_expired() {
            return Err(UowError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Finish the scope.
    ///
    /// - `Err` from the body: roll back and return it unchanged
    /// - deadline passed: roll back and return `DeadlineExceeded`
    /// - otherwise commit; a failed commit becomes the result
    pub fn close<R, E>(mut self, result: Result<R, E>) -> Result<R, E>
    where
        E: From<UowError>,
    {
        self.closed = true;

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                self.rollback("handler error");
                return Err(err);
            }
        };

        if let Err(err) = self.check_deadline() {
            self.rollback("deadline exceeded");
            return Err(E::from(err));
        }

        match self.tx.commit() {
            Ok(()) => {
                debug!(correlation_id = ?self.context.correlation_id(), "scope committed");
                Ok(value)
            }
            Err(err) => {
                error!(error = %err, correlation_id = ?self.context.correlation_id(), "commit failed");
                Err(E::from(UowError::Store(err)))
            }
        }
    }

    fn rollback(&self, reason: &str) {
        if self.tx.is_finished() {
            return;
        }
        match self.tx.rollback() {
            Ok(()) => debug!(reason, "scope rolled back"),
            Err(err) => warn!(reason, error = %err, "rollback failed"),
        }
    }
}

impl<T: Transaction> Drop for Scope<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if std::thread::panicking() {
            error!("rolling back scope after panic");
            self.rollback("panic");
        } else {
            self.rollback("scope dropped without close");
        }
    }
}
