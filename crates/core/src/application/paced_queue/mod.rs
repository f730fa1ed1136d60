// Paced Queue - serialized task queue with a fixed delay between items
//
// Producers `enqueue` deferred work and call `drain`/`spawn_drain`. Only one
// drain loop is ever active; it executes items strictly in FIFO order and
// sleeps `pacing` after each one, which caps the outbound request rate.

mod panic_guard;

use crate::domain::{ItemError, ItemOutcome, QueueConfig, QueueError, QueueItem, QueueStats};
use panic_guard::execute_isolated;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

struct QueueState {
    items: VecDeque<(u64, QueueItem)>,
    processing: bool,
    next_seq: u64,
    accepted: u64,
    rejected: u64,
    succeeded: u64,
    failed: u64,
}

/// In-memory FIFO with a single paced drain loop
///
/// The lock around the state is never held across an `.await`, so the
/// `processing` check-and-set is atomic with respect to every producer.
pub struct PacedQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl PacedQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(config.capacity),
                processing: false,
                next_seq: 0,
                accepted: 0,
                rejected: 0,
                succeeded: 0,
                failed: 0,
            }),
            config,
            idle: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Nothing panics while holding the lock; recover the state if it ever does.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item at the back of the queue
    ///
    /// Returns the sequence number stamped on the item (for log correlation).
    ///
    /// # Errors
    /// - QueueError::Full if the queue already holds `capacity` items; the item
    ///   is dropped without running
    pub fn enqueue(&self, item: QueueItem) -> Result<u64, QueueError> {
        let mut state = self.lock();
        if state.items.len() >= self.config.capacity {
            state.rejected += 1;
            warn!(
                queue = %self.config.name,
                capacity = self.config.capacity,
                "Queue full, rejecting item"
            );
            return Err(QueueError::Full {
                capacity: self.config.capacity,
            });
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.items.push_back((seq, item));
        state.accepted += 1;
        debug!(queue = %self.config.name, seq, size = state.items.len(), "Item enqueued");
        Ok(seq)
    }

    /// Current queue length
    pub fn size(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether a drain loop is currently active
    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    /// Empty queue and no active drain
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        !state.processing && state.items.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            name: self.config.name.clone(),
            size: state.items.len(),
            processing: state.processing,
            capacity: self.config.capacity,
            pacing_ms: u64::try_from(self.config.pacing.as_millis()).unwrap_or(u64::MAX),
            accepted: state.accepted,
            rejected: state.rejected,
            succeeded: state.succeeded,
            failed: state.failed,
        }
    }

    /// Run the drain loop until the queue is empty
    ///
    /// Returns immediately if another drain is already active. Item failures
    /// and panics are logged and counted; they never stop the loop.
    pub async fn drain(&self) {
        let mut active = {
            let mut state = self.lock();
            if state.processing {
                debug!(queue = %self.config.name, "Drain already active");
                return;
            }
            state.processing = true;
            ActiveDrain {
                queue: self,
                armed: true,
            }
        };

        info!(queue = %self.config.name, size = self.size(), "Drain started");

        loop {
            let next = {
                let mut state = self.lock();
                let next = state.items.pop_front();
                if next.is_none() {
                    // Reset under the same lock that observed the empty queue,
                    // so a concurrent enqueue + drain always starts a new loop.
                    state.processing = false;
                    active.armed = false;
                }
                next
            };

            let Some((seq, item)) = next else {
                break;
            };

            debug!(queue = %self.config.name, seq, "Executing item");
            let outcome = execute_isolated(seq, item).await;
            self.record(seq, outcome);

            sleep(self.config.pacing).await;
        }

        drop(active);
        self.idle.notify_waiters();
        info!(queue = %self.config.name, "Drain finished, queue empty");
    }

    /// Start a drain loop on the runtime unless one is already active
    pub fn spawn_drain(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.is_processing() {
            return None;
        }
        let queue = Arc::clone(self);
        Some(tokio::spawn(async move { queue.drain().await }))
    }

    /// Wait until the queue is empty and no drain is active
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn record(&self, seq: u64, outcome: ItemOutcome) {
        let mut state = self.lock();
        match outcome {
            Ok(()) => {
                state.succeeded += 1;
                debug!(queue = %self.config.name, seq, "Item completed");
            }
            Err(ItemError::Failed(msg)) => {
                state.failed += 1;
                warn!(queue = %self.config.name, seq, error = %msg, "Item failed, continuing");
            }
            Err(ItemError::Panicked(msg)) => {
                state.failed += 1;
                warn!(queue = %self.config.name, seq, error = %msg, "Item panicked, continuing");
            }
        }
    }
}

/// Clears `processing` if the drain future is dropped mid-loop
struct ActiveDrain<'a> {
    queue: &'a PacedQueue,
    armed: bool,
}

impl Drop for ActiveDrain<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.queue.lock().processing = false;
            self.queue.idle.notify_waiters();
            warn!(queue = %self.queue.config.name, "Drain interrupted before queue emptied");
        }
    }
}
