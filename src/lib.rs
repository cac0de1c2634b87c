//! Transactional messaging for event-sourced services.
//!
//! Every inbound request or message runs in one [`Scope`](uow::Scope): one
//! transaction that holds the aggregate events, the outbox rows and the inbox
//! row it produced. The scope commits all of them or none.
//!
//! ```text
//! handler ──▶ AggregateRepository::save ──▶ event store
//!                     │
//!                     └─▶ DomainEventRouter ──▶ OutboxWriter ──▶ outbox ──▶ OutboxProcessor ──▶ Broker
//! ```

pub mod aggregate;
pub mod bus;
pub mod config;
pub mod entity;
pub mod inbox;
pub mod microsvc;
pub mod ordering;
pub mod outbox;
pub mod repository;
pub mod router;
pub mod store;
pub mod uow;

pub use aggregate::{Aggregate, Snapshottable};
pub use bus::{Broker, InMemoryBroker, Message, PublishError, Subscriber};
pub use config::ServiceConfig;
pub use entity::{Entity, EventRecord, PayloadError};
pub use microsvc::{Context, Delivery, HandlerError, Service};
pub use outbox::{OutboxProcessor, OutboxProcessorThread, ProcessorConfig};
pub use repository::{AggregateRepository, RepositoryError};
pub use router::{CommandRouter, DomainEventRouter, IntegrationEventRouter};
pub use store::{Database, InMemoryDatabase, StoreError, Transaction};
pub use uow::{RequestContext, Scope, UnitOfWork, UowError};
