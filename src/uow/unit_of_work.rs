use std::sync::Arc;

use tracing::debug;

use crate::router::DomainEventRouter;
use crate::store::Database;

use super::context::RequestContext;
use super::error::UowError;
use super::scope::Scope;

/// Default number of versions between snapshots.
pub const DEFAULT_SNAPSHOT_FREQUENCY: u64 = 50;

/// Opens one [`Scope`] (one transaction) per request.
///
/// ## Example
///
/// ```ignore
/// let uow = UnitOfWork::new(db, ordering::domain_events());
///
/// let id = uow.run(RequestContext::new(), |scope| {
///     let mut order = Order::default();
///     order.create("o-1", "c-1", "p-1", items)?;
///     scope.repository::<Order>().save(&mut order)?;
///     Ok::<_, HandlerError>(order.id().to_string())
/// })?;
/// ```
pub struct UnitOfWork<D: Database> {
    db: D,
    domain_events: Arc<DomainEventRouter>,
    snapshot_frequency: u64,
}

impl<D: Database> UnitOfWork<D> {
    pub fn new(db: D, domain_events: DomainEventRouter) -> Self {
        Self {
            db,
            domain_events: Arc::new(domain_events),
            snapshot_frequency: DEFAULT_SNAPSHOT_FREQUENCY,
        }
    }

    /// Snapshot every `frequency` versions; `0` disables snapshots.
    pub fn with_snapshot_frequency(mut self, frequency: u64) -> Self {
        self.snapshot_frequency = frequency;
        self
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn domain_events(&self) -> &DomainEventRouter {
        &self.domain_events
    }

    /// Begin a transaction and bind a scope to it.
    pub fn begin(&self, context: RequestContext) -> Result<Scope<D::Tx>, UowError> {
        let tx = self.db.begin()?;
        debug!(correlation_id = ?context.correlation_id(), "scope opened");
        Ok(Scope::new(
            tx,
            Arc::clone(&self.domain_events),
            context,
            self.snapshot_frequency,
        ))
    }

    /// Run `body` inside a fresh scope and close it with the body's result.
    ///
    /// If `body` panics the scope rolls back while unwinding and the panic
    /// continues to the caller.
    pub fn run<R, E, F>(&self, context: RequestContext, body: F) -> Result<R, E>
    where
        F: FnOnce(&Scope<D::Tx>) -> Result<R, E>,
        E: From<UowError>,
    {
        let scope = self.begin(context).map_err(E::from)?;
        let result = body(&scope);
        scope.close(result)
    }
}
