//! Broker client traits.

use super::message::{Message, PublishError};

/// Pull-based consumer of one (channel, consumer group) pair.
pub trait Subscriber: Send + Sync {
    /// Poll for the next message, blocking until one is available or timeout.
    fn poll(&self, timeout_ms: u64) -> Result<Option<Message>, PublishError>;

    /// Acknowledge that a message has been processed.
    fn ack(&self, message_id: &str) -> Result<(), PublishError>;

    /// Reject a message so that it is delivered again.
    fn nack(&self, message_id: &str, reason: &str) -> Result<(), PublishError>;
}

/// A message broker client.
///
/// `publish` returns only once the broker durably accepted the message; the
/// outbox processor marks a row dispatched on `Ok` and nothing earlier.
pub trait Broker: Send + Sync {
    type Subscription: Subscriber + 'static;

    fn publish(&self, channel: &str, message: Message) -> Result<(), PublishError>;

    /// Join `group` on `channel`. Members of one group compete for messages;
    /// each group sees every message.
    fn subscribe(&self, channel: &str, group: &str) -> Result<Self::Subscription, PublishError>;
}
