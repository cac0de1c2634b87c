use std::collections::HashMap;

use crate::microsvc::{Context, HandlerError};
use crate::store::Transaction;

type EventHandler<T> = Box<dyn Fn(&Context<'_, T>) -> Result<(), HandlerError> + Send + Sync>;

/// Routes inbound integration events by (channel, message type).
///
/// A message whose type has no handler on its channel is filtered out: the
/// caller acknowledges it without opening a transaction.
pub struct IntegrationEventRouter<T: Transaction> {
    handlers: HashMap<(String, String), EventHandler<T>>,
}

impl<T: Transaction> Default for IntegrationEventRouter<T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<T: Transaction> IntegrationEventRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, channel: &str, message_type: &str, handler: F) -> Self
    where
        F: Fn(&Context<'_, T>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(
            (channel.to_string(), message_type.to_string()),
            Box::new(handler),
        );
        self
    }

    pub fn handles(&self, channel: &str, message_type: &str) -> bool {
        self.handlers
            .contains_key(&(channel.to_string(), message_type.to_string()))
    }

    /// Run the handler for `ctx.name()` on `channel`. Returns `false` when the
    /// message type is filtered out.
    pub fn dispatch(&self, channel: &str, ctx: &Context<'_, T>) -> Result<bool, HandlerError> {
        match self
            .handlers
            .get(&(channel.to_string(), ctx.name().to_string()))
        {
            Some(handler) => handler(ctx).map(|()| true),
            None => Ok(false),
        }
    }
}
