//! Service: the three entry points of a microservice, each one scope.
//!
//! - [`Service::dispatch`]: synchronous command (RPC)
//! - [`Service::handle_command_message`]: asynchronous command from the bus
//! - [`Service::handle_event_message`]: asynchronous integration event
//!
//! ## Example
//!
//! ```ignore
//! let service = Service::new(InMemoryDatabase::new(), domain_events())
//!     .command("CancelOrder", handlers::cancel_order)
//!     .on_event("mallbots.depot.events.ShoppingList", "depotapi.ShoppingListCompleted", handlers::on_list_completed);
//!
//! service.dispatch("CancelOrder", json!({ "id": "o-1" }), RequestContext::new())?;
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregate::Snapshottable;
use crate::bus::{Message, REPLY_CHANNEL};
use crate::router::{CommandRouter, DomainEventRouter, IntegrationEventRouter};
use crate::store::{Database, InboxStore, Transaction};
use crate::uow::{RequestContext, Scope, UnitOfWork};

use super::context::Context;
use super::error::HandlerError;

/// Message type of the reply published for a handled async command.
pub const REPLY_SUCCESS: &str = "Success";

/// Outcome of handling one inbound message. Every variant is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handled and recorded in the inbox.
    Handled,
    /// Already in the inbox; skipped.
    Duplicate,
    /// No handler for this message type; filtered out.
    Ignored,
}

/// A microservice: a unit of work plus static command and event tables.
pub struct Service<D: Database> {
    name: String,
    uow: UnitOfWork<D>,
    commands: CommandRouter<D::Tx>,
    events: IntegrationEventRouter<D::Tx>,
}

impl<D: Database> Service<D> {
    pub fn new(db: D, domain_events: DomainEventRouter) -> Self {
        Self {
            name: "service".to_string(),
            uow: UnitOfWork::new(db, domain_events),
            commands: CommandRouter::new(),
            events: IntegrationEventRouter::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_snapshot_frequency(mut self, frequency: u64) -> Self {
        self.uow = self.uow.with_snapshot_frequency(frequency);
        self
    }

    /// Register a command handler. Uses builder pattern.
    pub fn command<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Context<'_, D::Tx>) -> Result<Option<Value>, HandlerError> + Send + Sync + 'static,
    {
        self.commands = self.commands.register(name, handler);
        self
    }

    /// Register an integration event handler for `message_type` on `channel`.
    pub fn on_event<F>(mut self, channel: &str, message_type: &str, handler: F) -> Self
    where
        F: Fn(&Context<'_, D::Tx>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.events = self.events.on(channel, message_type, handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_of_work(&self) -> &UnitOfWork<D> {
        &self.uow
    }

    pub fn database(&self) -> &D {
        self.uow.database()
    }

    /// Synchronous command entry point: one scope around one handler.
    pub fn dispatch(
        &self,
        command: &str,
        input: Value,
        context: RequestContext,
    ) -> Result<Option<Value>, HandlerError> {
        if !self.commands.contains(command) {
            return Err(HandlerError::UnknownCommand(command.to_string()));
        }

        debug!(service = %self.name, command, "dispatch");
        self.uow.run(context, |scope| {
            let ctx = Context::new(command, input, scope);
            self.commands.dispatch(&ctx)
        })
    }

    /// Query entry point: load the current state of an aggregate.
    pub fn get<A: Snapshottable>(&self, id: &str) -> Result<A, HandlerError> {
        self.uow.run(RequestContext::new(), |scope| {
            Ok(scope.repository::<A>().load(id)?)
        })
    }

    /// Run arbitrary work in a fresh scope.
    pub fn run<R, F>(&self, context: RequestContext, body: F) -> Result<R, HandlerError>
    where
        F: FnOnce(&Scope<D::Tx>) -> Result<R, HandlerError>,
    {
        self.uow.run(context, body)
    }

    /// Asynchronous command entry point.
    ///
    /// Deduplicates on `(group, message.id)`, runs the handler, records the
    /// inbox row and, when the message names a reply channel, publishes the
    /// reply through the outbox. All of it commits or none of it does.
    pub fn handle_command_message(
        &self,
        group: &str,
        message: &Message,
    ) -> Result<Delivery, HandlerError> {
        if !self.commands.contains(&message.message_type) {
            debug!(service = %self.name, message_type = %message.message_type, "command filtered out");
            return Ok(Delivery::Ignored);
        }

        let input = json_input(message)?;
        let result: Result<Delivery, HandlerError> = self
            .uow
            .run(RequestContext::from_message(message), |scope| {
                let inbox = scope.inbox(group);
                if inbox.contains(&message.id)? {
                    return Ok(Delivery::Duplicate);
                }

                let ctx = Context::for_message(message, input, scope);
                let reply = self.commands.dispatch(&ctx)?;
                inbox.mark(&message.id)?;

                if let Some(reply_channel) = message.meta(REPLY_CHANNEL) {
                    let reply = Message::json(
                        format!("{}:reply", message.id),
                        REPLY_SUCCESS,
                        &reply.unwrap_or(Value::Null),
                    )?;
                    scope.publisher().publish(reply_channel, reply)?;
                }
                Ok(Delivery::Handled)
            });

        self.settle(group, message, result)
    }

    /// Asynchronous integration-event entry point.
    pub fn handle_event_message(
        &self,
        channel: &str,
        group: &str,
        message: &Message,
    ) -> Result<Delivery, HandlerError> {
        if !self.events.handles(channel, &message.message_type) {
            debug!(service = %self.name, channel, message_type = %message.message_type, "event filtered out");
            return Ok(Delivery::Ignored);
        }

        let input = json_input(message)?;
        let result: Result<Delivery, HandlerError> = self
            .uow
            .run(RequestContext::from_message(message), |scope| {
                let inbox = scope.inbox(group);
                if inbox.contains(&message.id)? {
                    return Ok(Delivery::Duplicate);
                }

                let ctx = Context::for_message(message, input, scope);
                self.events.dispatch(channel, &ctx)?;
                inbox.mark(&message.id)?;
                Ok(Delivery::Handled)
            });

        self.settle(group, message, result)
    }

    fn settle(
        &self,
        group: &str,
        message: &Message,
        result: Result<Delivery, HandlerError>,
    ) -> Result<Delivery, HandlerError> {
        match result {
            Ok(Delivery::Duplicate) | Err(HandlerError::Duplicate { .. }) => {
                warn!(service = %self.name, group, message_id = %message.id, "duplicate delivery skipped");
                Ok(Delivery::Duplicate)
            }
            Ok(delivery) => Ok(delivery),
            Err(err) if self.handled_elsewhere(group, &message.id) => {
                warn!(service = %self.name, group, message_id = %message.id, error = %err, "lost race to a concurrent delivery");
                Ok(Delivery::Duplicate)
            }
            Err(err) => {
                warn!(service = %self.name, group, message_id = %message.id, error = %err, "message handling failed");
                Err(err)
            }
        }
    }

    /// Whether a concurrent delivery of `message_id` committed its inbox row.
    /// Reads through a fresh transaction that is rolled back.
    fn handled_elsewhere(&self, group: &str, message_id: &str) -> bool {
        let Ok(tx) = self.database().begin() else {
            return false;
        };
        let found = tx.inbox_contains(group, message_id).unwrap_or(false);
        if let Err(err) = tx.rollback() {
            debug!(error = %err, "inbox lookup rollback failed");
        }
        found
    }
}

/// Parse a message payload as JSON. An empty payload is `null`.
fn json_input(message: &Message) -> Result<Value, HandlerError> {
    if message.payload.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&message.payload).map_err(|e| HandlerError::DecodeFailed(e.to_string()))
}
