//! Context passed to command and event handlers.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::aggregate::Snapshottable;
use crate::bus::Message;
use crate::outbox::OutboxWriter;
use crate::repository::AggregateRepository;
use crate::store::Transaction;
use crate::uow::{RequestContext, Scope};

use super::error::HandlerError;

/// What a handler sees: the message name, its JSON input, and the scope it
/// runs in. Everything a handler writes goes through the scope's transaction.
///
/// ## Example
///
/// ```ignore
/// pub fn handle<T: Transaction>(ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
///     let input = ctx.input::<CancelOrder>()?;
///     let orders = ctx.repository::<Order>();
///     let mut order = orders.load(&input.id)?;
///     order.cancel()?;
///     orders.save(&mut order)?;
///     Ok(None)
/// }
/// ```
pub struct Context<'a, T: Transaction> {
    name: &'a str,
    input: Value,
    scope: &'a Scope<T>,
    message: Option<&'a Message>,
}

impl<'a, T: Transaction> Context<'a, T> {
    pub(crate) fn new(name: &'a str, input: Value, scope: &'a Scope<T>) -> Self {
        Self {
            name,
            input,
            scope,
            message: None,
        }
    }

    pub(crate) fn for_message(
        message: &'a Message,
        input: Value,
        scope: &'a Scope<T>,
    ) -> Self {
        Self {
            name: &message.message_type,
            input,
            scope,
            message: Some(message),
        }
    }

    /// Deserialize the input into a typed struct.
    pub fn input<I: DeserializeOwned>(&self) -> Result<I, HandlerError> {
        serde_json::from_value(self.input.clone())
            .map_err(|e| HandlerError::DecodeFailed(e.to_string()))
    }

    pub fn raw_input(&self) -> &Value {
        &self.input
    }

    /// Command name or message type being handled.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The inbound message, on the asynchronous paths.
    pub fn message(&self) -> Option<&Message> {
        self.message
    }

    pub fn scope(&self) -> &Scope<T> {
        self.scope
    }

    pub fn request(&self) -> &RequestContext {
        self.scope.context()
    }

    pub fn repository<A: Snapshottable>(&self) -> AggregateRepository<'_, T, A> {
        self.scope.repository::<A>()
    }

    pub fn publisher(&self) -> OutboxWriter<'_, T> {
        self.scope.publisher()
    }
}
