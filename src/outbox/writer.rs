use tracing::debug;

use crate::bus::{Message, CAUSATION_ID, CORRELATION_ID};
use crate::store::{OutboxStore, StoreError};
use crate::uow::RequestContext;

/// Publishes by inserting into the outbox table of the current transaction.
///
/// Nothing reaches the broker until the transaction commits and the outbox
/// processor picks the row up.
pub struct OutboxWriter<'a, T: OutboxStore> {
    tx: &'a T,
    context: &'a RequestContext,
}

impl<'a, T: OutboxStore> OutboxWriter<'a, T> {
    pub fn new(tx: &'a T, context: &'a RequestContext) -> Self {
        Self { tx, context }
    }

    /// Queue `message` for `channel`, stamping correlation and causation IDs
    /// from the request when the message carries none.
    pub fn publish(&self, channel: &str, mut message: Message) -> Result<(), StoreError> {
        if message.meta(CORRELATION_ID).is_none() {
            if let Some(id) = self.context.correlation_id() {
                message = message.with_metadata(CORRELATION_ID, id);
            }
        }
        if message.meta(CAUSATION_ID).is_none() {
            if let Some(id) = self.context.causation_id() {
                message = message.with_metadata(CAUSATION_ID, id);
            }
        }

        debug!(channel, message_id = %message.id, message_type = %message.message_type, "outbox insert");
        self.tx.insert_outbox(channel, message)
    }
}
