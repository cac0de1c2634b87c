use std::time::{Duration, Instant};

use crate::bus::{Message, CORRELATION_ID};

/// Caller-supplied request data carried through a scope: correlation IDs
/// for outgoing messages and an optional deadline.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    correlation_id: Option<String>,
    causation_id: Option<String>,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for handling an inbound message: the message becomes the
    /// causation, and its correlation ID (or its own ID) is carried forward.
    pub fn from_message(message: &Message) -> Self {
        let correlation = message.meta(CORRELATION_ID).unwrap_or(&message.id);
        Self {
            correlation_id: Some(correlation.to_string()),
            causation_id: Some(message.id.clone()),
            deadline: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_causation_id(mut self, id: impl Into<String>) -> Self {
        self.causation_id = Some(id.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}
