//! Background thread running the outbox processor.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::bus::Broker;
use crate::store::OutboxSource;

use super::processor::{OutboxProcessor, ProcessorConfig};

/// Statistics from the outbox processor thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessorStats {
    pub published: usize,
    pub failures: usize,
    pub polls: usize,
}

/// One long-running drain loop per process.
///
/// ## Example
///
/// ```ignore
/// let processor = OutboxProcessorThread::spawn(db.clone(), broker.clone(), ProcessorConfig::default());
/// // ... serve requests ...
/// let stats = processor.stop();
/// ```
pub struct OutboxProcessorThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<ProcessorStats>>,
}

impl OutboxProcessorThread {
    pub fn spawn<S, B>(source: S, broker: B, config: ProcessorConfig) -> Self
    where
        S: OutboxSource + 'static,
        B: Broker + 'static,
    {
        let (stop_tx, stop_rx) = channel();
        let processor = OutboxProcessor::new(source, broker).with_batch_size(config.batch_size);
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        let handle = thread::spawn(move || {
            info!(batch_size = config.batch_size, "outbox processor started");
            let mut stats = ProcessorStats::default();
            let mut consecutive_failures: u32 = 0;

            loop {
                stats.polls += 1;

                let failed = match processor.process_pending() {
                    Ok(result) => {
                        stats.published += result.dispatched;
                        result.is_blocked()
                    }
                    Err(err) => {
                        warn!(error = %err, "outbox read failed");
                        true
                    }
                };

                let wait = if failed {
                    stats.failures += 1;
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    let delay = config.backoff.delay(consecutive_failures);
                    warn!(consecutive_failures, delay_ms = delay.as_millis() as u64, "outbox processor backing off");
                    delay
                } else {
                    consecutive_failures = 0;
                    poll_interval
                };

                match stop_rx.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }

            info!(published = stats.published, failures = stats.failures, "outbox processor stopped");
            stats
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the processor to stop and wait for it. Returns its statistics.
    pub fn stop(mut self) -> ProcessorStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => ProcessorStats::default(),
        }
    }

    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for OutboxProcessorThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
