use std::fmt;

use crate::entity::{Entity, EventRecord, PayloadError};

/// Trait for domain aggregates that can be event-sourced.
pub trait Aggregate: Sized + Default {
    /// Logical type name, used to build the event stream key.
    const TYPE_NAME: &'static str;

    type ReplayError: fmt::Display + From<PayloadError>;

    fn new_empty() -> Self {
        Self::default()
    }
    fn entity(&self) -> &Entity;
    fn entity_mut(&mut self) -> &mut Entity;
    fn replay_event(&mut self, event: &EventRecord) -> Result<(), Self::ReplayError>;

    fn id(&self) -> &str {
        self.entity().id()
    }

    fn version(&self) -> u64 {
        self.entity().version()
    }
}

/// Stream key of an aggregate: `"{TYPE_NAME}:{id}"`.
pub fn stream_id<A: Aggregate>(id: &str) -> String {
    format!("{}:{}", A::TYPE_NAME, id)
}

#[macro_export]
macro_rules! impl_aggregate {
    ($ty:ty, $type_name:expr, $entity:ident, $replay:ident) => {
        $crate::impl_aggregate!($ty, $type_name, $entity, $replay, $crate::PayloadError);
    };
    ($ty:ty, $type_name:expr, $entity:ident, $replay:ident, $err:ty) => {
        impl $crate::Aggregate for $ty {
            const TYPE_NAME: &'static str = $type_name;

            type ReplayError = $err;

            fn entity(&self) -> &$crate::Entity {
                &self.$entity
            }

            fn entity_mut(&mut self) -> &mut $crate::Entity {
                &mut self.$entity
            }

            fn replay_event(
                &mut self,
                event: &$crate::EventRecord,
            ) -> Result<(), Self::ReplayError> {
                Self::$replay(self, event)
            }
        }
    };
}

/// Replay `history` onto `aggregate`, which is either empty or restored from a snapshot.
pub fn hydrate<A: Aggregate>(aggregate: &mut A, history: &[EventRecord]) -> Result<(), String> {
    let mut entity = std::mem::take(aggregate.entity_mut());
    let result = entity.replay(history, |event| {
        aggregate
            .replay_event(event)
            .map_err(|e| ReplayFailure(e.to_string()))
    });
    *aggregate.entity_mut() = entity;
    result.map_err(|ReplayFailure(message)| message)
}

struct ReplayFailure(String);

impl From<PayloadError> for ReplayFailure {
    fn from(err: PayloadError) -> Self {
        ReplayFailure(err.to_string())
    }
}
