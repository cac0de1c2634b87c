//! Transactional outbox.
//!
//! Handlers publish through an [`OutboxWriter`], which inserts rows in the
//! request's transaction. The [`OutboxProcessor`] drains committed rows to the
//! broker, either on demand or from an [`OutboxProcessorThread`].

mod backoff;
mod processor;
mod record;
mod thread;
mod writer;

pub use backoff::BackoffConfig;
pub use processor::{DrainResult, OutboxProcessor, ProcessorConfig};
pub use record::OutboxRecord;
pub use thread::{OutboxProcessorThread, ProcessorStats};
pub use writer::OutboxWriter;
