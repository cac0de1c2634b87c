use std::collections::HashMap;

use serde_json::Value;

use crate::microsvc::{Context, HandlerError};
use crate::store::Transaction;

type CommandHandler<T> =
    Box<dyn Fn(&Context<'_, T>) -> Result<Option<Value>, HandlerError> + Send + Sync>;

/// Static name-to-handler table for commands.
///
/// Every command name maps to exactly one handler; registering a name twice
/// replaces the earlier handler. Dispatching a name with no handler is an
/// [`HandlerError::UnknownCommand`].
pub struct CommandRouter<T: Transaction> {
    handlers: HashMap<String, CommandHandler<T>>,
}

impl<T: Transaction> Default for CommandRouter<T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<T: Transaction> CommandRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Context<'_, T>) -> Result<Option<Value>, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Run the handler registered for `ctx.name()`.
    pub fn dispatch(&self, ctx: &Context<'_, T>) -> Result<Option<Value>, HandlerError> {
        let handler = self
            .handlers
            .get(ctx.name())
            .ok_or_else(|| HandlerError::UnknownCommand(ctx.name().to_string()))?;
        handler(ctx)
    }
}
