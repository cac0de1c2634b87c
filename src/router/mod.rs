//! Message routers.
//!
//! - [`CommandRouter`]: command name to one handler, optional reply
//! - [`DomainEventRouter`]: in-process domain events to integration messages
//! - [`IntegrationEventRouter`]: inbound integration events by channel and type

mod command;
mod domain;
mod integration;

pub use command::CommandRouter;
pub use domain::{DispatchError, DomainEvent, DomainEventRouter, Translation};
pub use integration::IntegrationEventRouter;
