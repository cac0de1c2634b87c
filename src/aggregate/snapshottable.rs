use serde::{de::DeserializeOwned, Serialize};

use super::Aggregate;

/// Aggregates whose state can be captured at a version and restored later,
/// bounding replay to the events after that version.
///
/// The associated `Snapshot` is a separate struct (e.g. `OrderV1`) so the
/// persisted shape can be versioned independently of the aggregate.
pub trait Snapshottable: Aggregate {
    type Snapshot: Serialize + DeserializeOwned;

    fn create_snapshot(&self) -> Self::Snapshot;

    fn restore_from_snapshot(&mut self, snapshot: Self::Snapshot);
}
