//! In-process domain-event dispatch.
//!
//! Subscribers are pure translators from a stored domain event to at most one
//! integration message. The router publishes every translation through the
//! scope's outbox writer, so the messages commit or roll back together with
//! the events that produced them.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::bus::{Message, PublishError};
use crate::entity::{EventRecord, PayloadError};
use crate::outbox::OutboxWriter;
use crate::store::{OutboxStore, StoreError};

/// A domain event as seen by translators.
#[derive(Clone, Copy, Debug)]
pub struct DomainEvent<'a> {
    aggregate_type: &'a str,
    aggregate_id: &'a str,
    record: &'a EventRecord,
}

impl<'a> DomainEvent<'a> {
    pub fn new(aggregate_type: &'a str, aggregate_id: &'a str, record: &'a EventRecord) -> Self {
        Self {
            aggregate_type,
            aggregate_id,
            record,
        }
    }

    pub fn aggregate_type(&self) -> &str {
        self.aggregate_type
    }

    pub fn aggregate_id(&self) -> &str {
        self.aggregate_id
    }

    pub fn name(&self) -> &str {
        &self.record.event_name
    }

    /// Aggregate version this event produced.
    pub fn version(&self) -> u64 {
        self.record.sequence
    }

    pub fn record(&self) -> &EventRecord {
        self.record
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        self.record.decode()
    }

    /// Deterministic ID for the message translated from this event:
    /// `"{aggregate_id}:{event_name}:{version}"`.
    pub fn message_id(&self) -> String {
        format!("{}:{}:{}", self.aggregate_id, self.name(), self.version())
    }
}

/// An integration message and the channel it goes to.
#[derive(Clone, Debug, PartialEq)]
pub struct Translation {
    pub channel: String,
    pub message: Message,
}

impl Translation {
    pub fn new(channel: impl Into<String>, message: Message) -> Self {
        Self {
            channel: channel.into(),
            message,
        }
    }
}

type Translator =
    Box<dyn Fn(&DomainEvent<'_>) -> Result<Option<Translation>, PublishError> + Send + Sync>;

/// Error while dispatching a domain event.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("translating {event} failed: {source}")]
    Translate {
        event: String,
        #[source]
        source: PublishError,
    },
    #[error(transparent)]
    Outbox(#[from] StoreError),
}

/// Routes domain events by name to their translators.
///
/// ## Example
///
/// ```ignore
/// let router = DomainEventRouter::new()
///     .on("OrderCreated", |event| {
///         let payload: OrderCreated = event.decode()?;
///         let message = Message::json(event.message_id(), "ordersapi.OrderCreated", &payload)?;
///         Ok(Some(Translation::new("mallbots.ordering.events.Order", message)))
///     });
/// ```
#[derive(Default)]
pub struct DomainEventRouter {
    translators: HashMap<String, Vec<Translator>>,
}

impl DomainEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a translator to `event_name`. Several may subscribe to one name.
    pub fn on<F>(mut self, event_name: &str, translator: F) -> Self
    where
        F: Fn(&DomainEvent<'_>) -> Result<Option<Translation>, PublishError> + Send + Sync + 'static,
    {
        self.translators
            .entry(event_name.to_string())
            .or_default()
            .push(Box::new(translator));
        self
    }

    /// Run every translator subscribed to the event.
    pub fn translate(&self, event: &DomainEvent<'_>) -> Result<Vec<Translation>, PublishError> {
        let Some(translators) = self.translators.get(event.name()) else {
            return Ok(Vec::new());
        };

        let mut translations = Vec::new();
        for translate in translators {
            if let Some(translation) = translate(event)? {
                translations.push(translation);
            }
        }
        Ok(translations)
    }

    /// Translate the event and write every result to the outbox.
    /// Returns the number of messages written.
    pub fn dispatch<T: OutboxStore>(
        &self,
        event: &DomainEvent<'_>,
        publisher: &OutboxWriter<'_, T>,
    ) -> Result<usize, DispatchError> {
        let translations = self
            .translate(event)
            .map_err(|source| DispatchError::Translate {
                event: event.name().to_string(),
                source,
            })?;

        let count = translations.len();
        for Translation { channel, message } in translations {
            publisher.publish(&channel, message)?;
        }
        if count > 0 {
            debug!(event = event.name(), aggregate_id = event.aggregate_id(), count, "domain event translated");
        }
        Ok(count)
    }

    /// Event names with at least one subscriber.
    pub fn event_names(&self) -> Vec<&str> {
        self.translators.keys().map(|name| name.as_str()).collect()
    }
}
