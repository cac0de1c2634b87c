//! Message bus abstractions.
//!
//! ```text
//! OutboxProcessor ──publish(channel, msg)──▶ Broker ──poll/ack/nack──▶ transports
//! ```
//!
//! [`Broker`] is the client seam for a real broker; [`InMemoryBroker`] is the
//! bundled implementation used by tests and single-process setups.

mod broker;
mod in_memory;
mod message;

pub use broker::{Broker, Subscriber};
pub use in_memory::{InMemoryBroker, InMemorySubscription};
pub use message::{Message, PublishError, CAUSATION_ID, CORRELATION_ID, REPLY_CHANNEL};
