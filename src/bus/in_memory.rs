//! In-memory broker for tests and single-process deployments.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use super::broker::{Broker, Subscriber};
use super::message::{Message, PublishError};

/// Thread-safe in-memory broker.
///
/// - one append-only log per channel
/// - one cursor per (channel, group); subscriptions in a group compete
/// - nacked messages are requeued behind the messages not yet delivered
/// - can be switched offline to simulate an unavailable broker
///
/// Clones share the same state.
///
/// ```
/// use sourced_ordering::bus::{Broker, InMemoryBroker, Message, Subscriber};
///
/// let broker = InMemoryBroker::new();
/// let sub = broker.subscribe("orders", "billing").unwrap();
/// broker.publish("orders", Message::new("m-1", "OrderCreated", vec![])).unwrap();
///
/// let message = sub.poll(10).unwrap().unwrap();
/// assert_eq!(message.message_type, "OrderCreated");
/// sub.ack(&message.id).unwrap();
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    channels: HashMap<String, Vec<Message>>,
    groups: HashMap<(String, String), GroupCursor>,
    offline: bool,
}

#[derive(Default)]
struct GroupCursor {
    next: usize,
    in_flight: HashMap<String, usize>,
    redeliver: VecDeque<usize>,
}

impl BrokerState {
    fn next_for(&mut self, channel: &str, group: &str) -> Option<Message> {
        let log = self.channels.get(channel)?;
        let cursor = self
            .groups
            .entry((channel.to_string(), group.to_string()))
            .or_default();

        let index = if cursor.next < log.len() {
            cursor.next += 1;
            cursor.next - 1
        } else {
            cursor.redeliver.pop_front()?
        };

        let message = log[index].clone();
        cursor.in_flight.insert(message.id.clone(), index);
        Some(message)
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate the broker going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.state().offline = !available;
    }

    /// All messages published to `channel`, in order.
    pub fn messages(&self, channel: &str) -> Vec<Message> {
        self.state()
            .channels
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    /// Message types published to `channel`, in order.
    pub fn message_types(&self, channel: &str) -> Vec<String> {
        self.state()
            .channels
            .get(channel)
            .map(|log| log.iter().map(|m| m.message_type.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of messages `group` has received but not yet acknowledged.
    pub fn in_flight(&self, channel: &str, group: &str) -> usize {
        self.state()
            .groups
            .get(&(channel.to_string(), group.to_string()))
            .map(|cursor| cursor.in_flight.len() + cursor.redeliver.len())
            .unwrap_or(0)
    }
}

impl Broker for InMemoryBroker {
    type Subscription = InMemorySubscription;

    fn publish(&self, channel: &str, message: Message) -> Result<(), PublishError> {
        let mut state = self.state();
        if state.offline {
            return Err(PublishError::ConnectionFailed("broker offline".into()));
        }
        debug!(channel, message_id = %message.id, message_type = %message.message_type, "published");
        state
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    fn subscribe(&self, channel: &str, group: &str) -> Result<InMemorySubscription, PublishError> {
        self.state()
            .groups
            .entry((channel.to_string(), group.to_string()))
            .or_default();
        Ok(InMemorySubscription {
            broker: self.clone(),
            channel: channel.to_string(),
            group: group.to_string(),
        })
    }
}

/// A member of a consumer group on an [`InMemoryBroker`] channel.
#[derive(Clone)]
pub struct InMemorySubscription {
    broker: InMemoryBroker,
    channel: String,
    group: String,
}

impl InMemorySubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl Subscriber for InMemorySubscription {
    fn poll(&self, timeout_ms: u64) -> Result<Option<Message>, PublishError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if let Some(message) = self.broker.state().next_for(&self.channel, &self.group) {
                return Ok(Some(message));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ack(&self, message_id: &str) -> Result<(), PublishError> {
        let mut state = self.broker.state();
        if let Some(cursor) = state
            .groups
            .get_mut(&(self.channel.clone(), self.group.clone()))
        {
            cursor.in_flight.remove(message_id);
        }
        Ok(())
    }

    fn nack(&self, message_id: &str, reason: &str) -> Result<(), PublishError> {
        let mut state = self.broker.state();
        let cursor = state
            .groups
            .get_mut(&(self.channel.clone(), self.group.clone()))
            .ok_or_else(|| PublishError::Rejected(format!("unknown group {}", self.group)))?;
        let index = cursor
            .in_flight
            .remove(message_id)
            .ok_or_else(|| PublishError::Rejected(format!("{message_id} is not in flight")))?;
        debug!(message_id, reason, group = %self.group, "nacked, will redeliver");
        cursor.redeliver.push_back(index);
        Ok(())
    }
}
