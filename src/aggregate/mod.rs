mod aggregate;
mod snapshottable;

pub use aggregate::{hydrate, stream_id, Aggregate};
pub use snapshottable::Snapshottable;
