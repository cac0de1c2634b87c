//! Bus transports: background threads feeding broker messages into a service.

use std::sync::mpsc::{self, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::bus::{Message, Subscriber};
use crate::store::Database;

use super::error::HandlerError;
use super::service::{Delivery, Service};

/// Counters collected by a transport thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Messages handled and acknowledged.
    pub handled: usize,
    /// Redeliveries skipped by the inbox and acknowledged.
    pub duplicates: usize,
    /// Messages with no handler, acknowledged without a transaction.
    pub ignored: usize,
    /// Messages that failed with a transient error and were nacked for redelivery.
    pub failed: usize,
    /// Messages that failed with a permanent error, acknowledged and dropped.
    pub rejected: usize,
    pub polls: usize,
}

/// Handle to a background transport thread. Drop or call `stop()` to shut down.
pub struct TransportHandle {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<TransportStats>>,
}

impl TransportHandle {
    /// Stop the transport and wait for it to finish. Returns stats.
    pub fn stop(mut self) -> TransportStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => TransportStats::default(),
        }
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

/// Consume asynchronous commands for `group` and dispatch them to `service`.
///
/// Members of one group compete, so several listeners on the same group
/// share the load.
///
/// ## Example
///
/// ```ignore
/// let service = Arc::new(ordering_service(db.clone(), &config));
/// let subscription = broker.subscribe(contracts::COMMAND_CHANNEL, contracts::COMMAND_GROUP)?;
/// let handle = microsvc::listen_commands(
///     service.clone(),
///     contracts::COMMAND_GROUP,
///     subscription,
///     Duration::from_millis(20),
/// );
///
/// let stats = handle.stop();
/// ```
pub fn listen_commands<D, S>(
    service: Arc<Service<D>>,
    group: &str,
    subscriber: S,
    poll_interval: Duration,
) -> TransportHandle
where
    D: Database,
    S: Subscriber + 'static,
{
    let group = group.to_string();
    spawn_consumer(subscriber, poll_interval, move |message| {
        service.handle_command_message(&group, message)
    })
}

/// Consume integration events published on `channel` for `group`.
pub fn subscribe_events<D, S>(
    service: Arc<Service<D>>,
    channel: &str,
    group: &str,
    subscriber: S,
    poll_interval: Duration,
) -> TransportHandle
where
    D: Database,
    S: Subscriber + 'static,
{
    let channel = channel.to_string();
    let group = group.to_string();
    spawn_consumer(subscriber, poll_interval, move |message| {
        service.handle_event_message(&channel, &group, message)
    })
}

fn spawn_consumer<S, F>(subscriber: S, poll_interval: Duration, handle: F) -> TransportHandle
where
    S: Subscriber + 'static,
    F: Fn(&Message) -> Result<Delivery, HandlerError> + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel();
    let timeout_ms = poll_interval.as_millis() as u64;

    let handle = std::thread::spawn(move || {
        let mut stats = TransportStats::default();

        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            stats.polls += 1;

            let message = match subscriber.poll(timeout_ms) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(err) => {
                    debug!(error = %err, "poll failed");
                    std::thread::sleep(poll_interval);
                    continue;
                }
            };

            match handle(&message) {
                Ok(delivery) => {
                    ack(&subscriber, &message);
                    match delivery {
                        Delivery::Handled => stats.handled += 1,
                        Delivery::Duplicate => stats.duplicates += 1,
                        Delivery::Ignored => stats.ignored += 1,
                    }
                }
                Err(err) if err.is_retryable() => {
                    warn!(message_id = %message.id, error = %err, "nacking message");
                    if let Err(nack_err) = subscriber.nack(&message.id, &err.to_string()) {
                        warn!(message_id = %message.id, error = %nack_err, "nack failed");
                    }
                    stats.failed += 1;
                    std::thread::sleep(poll_interval);
                }
                Err(err) => {
                    // Redelivery cannot fix it.
                    error!(
                        message_id = %message.id,
                        message_type = %message.message_type,
                        error = %err,
                        "dropping message after permanent failure"
                    );
                    ack(&subscriber, &message);
                    stats.rejected += 1;
                }
            }
        }

        stats
    });

    TransportHandle {
        stop_tx,
        handle: Some(handle),
    }
}

fn ack<S: Subscriber>(subscriber: &S, message: &Message) {
    if let Err(err) = subscriber.ack(&message.id) {
        warn!(message_id = %message.id, error = %err, "ack failed");
    }
}
