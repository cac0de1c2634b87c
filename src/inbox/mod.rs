//! Inbox deduplication for at-least-once delivery.
//!
//! A consumer checks the inbox before handling a message and records the
//! message in the same transaction as the handler's effects, so a redelivered
//! copy is skipped and acknowledged.

mod inbox;
mod record;

pub use inbox::Inbox;
pub use record::InboxRecord;
