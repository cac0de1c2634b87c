use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::Broker;
use crate::store::{OutboxSource, StoreError};

use super::backoff::BackoffConfig;

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Outbox processor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Result of one drain pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainResult {
    /// Rows sent and marked dispatched.
    pub dispatched: usize,
    /// Sequence of the row the broker refused; the pass stopped there.
    pub blocked_at: Option<u64>,
    pub last_error: Option<String>,
}

impl DrainResult {
    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }
}

/// Drains committed outbox rows to the broker in creation order.
///
/// A row is marked dispatched only after the broker accepted it. When the
/// broker refuses a row the pass stops, so later rows never overtake it.
/// Delivery is at-least-once: a crash between publish and mark resends the row.
pub struct OutboxProcessor<S, B> {
    source: S,
    broker: B,
    batch_size: usize,
}

impl<S: OutboxSource, B: Broker> OutboxProcessor<S, B> {
    pub fn new(source: S, broker: B) -> Self {
        Self {
            source,
            broker,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Send every undispatched row, batch by batch, until none are left or the
    /// broker refuses one.
    pub fn process_pending(&self) -> Result<DrainResult, StoreError> {
        let mut result = DrainResult::default();

        loop {
            let rows = self.source.undispatched(self.batch_size)?;
            if rows.is_empty() {
                return Ok(result);
            }

            for row in rows {
                if let Err(err) = self.broker.publish(&row.channel, row.message.clone()) {
                    warn!(
                        sequence = row.sequence,
                        message_id = %row.message.id,
                        channel = %row.channel,
                        error = %err,
                        "broker refused outbox message"
                    );
                    result.blocked_at = Some(row.sequence);
                    result.last_error = Some(err.to_string());
                    return Ok(result);
                }

                self.source.mark_dispatched(row.sequence)?;
                result.dispatched += 1;
                debug!(sequence = row.sequence, message_id = %row.message.id, "outbox message dispatched");
            }
        }
    }
}
