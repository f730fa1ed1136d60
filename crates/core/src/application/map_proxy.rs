// Map Proxy Service - producer side of the paced queue
//
// One inbound proxy request becomes one queue item. The item performs the
// outbound fetch and hands the result back to the waiting caller.

use crate::application::paced_queue::PacedQueue;
use crate::domain::{ItemError, QueueItem, QueueStats};
use crate::error::{AppError, Result};
use crate::port::{UpstreamError, UpstreamFetcher, UpstreamRequest, UpstreamResponse};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Receiving half of a relayed upstream result
pub type RelayReceiver = oneshot::Receiver<std::result::Result<UpstreamResponse, UpstreamError>>;

/// Build a fetch-and-relay item for one upstream request
///
/// The item fails (from the queue's point of view) only on transport errors;
/// non-2xx upstream answers are relayed as-is.
pub fn relay_item(
    upstream: Arc<dyn UpstreamFetcher>,
    request: UpstreamRequest,
) -> (QueueItem, RelayReceiver) {
    let (tx, rx) = oneshot::channel();

    let item = QueueItem::new(async move {
        let result = upstream.fetch(&request).await;
        let outcome = match &result {
            Ok(response) => {
                debug!(path = %request.path, status = response.status, "Upstream answered");
                Ok(())
            }
            Err(e) => Err(ItemError::Failed(e.to_string())),
        };

        if tx.send(result).is_err() {
            debug!(path = %request.path, "Caller went away before the relay completed");
        }
        outcome
    });

    (item, rx)
}

/// Map Proxy Service
///
/// Owns the queue for the life of the process; route handlers hold it by `Arc`.
pub struct MapProxyService {
    queue: Arc<PacedQueue>,
    upstream: Arc<dyn UpstreamFetcher>,
}

impl MapProxyService {
    pub fn new(queue: Arc<PacedQueue>, upstream: Arc<dyn UpstreamFetcher>) -> Self {
        Self { queue, upstream }
    }

    pub fn queue(&self) -> &Arc<PacedQueue> {
        &self.queue
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Enqueue a relay for `request`, start draining and wait for the result
    ///
    /// # Errors
    /// - AppError::Queue(QueueError::Full) immediately when the queue is at capacity
    /// - AppError::Upstream on transport failure
    /// - AppError::Internal if the item was dropped without answering
    pub async fn proxy(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let path = request.path.clone();
        let (item, rx) = relay_item(Arc::clone(&self.upstream), request);

        let seq = self.queue.enqueue(item)?;
        info!(seq, path = %path, size = self.queue.size(), "Proxy request queued");

        self.queue.spawn_drain();

        match rx.await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Internal(format!(
                "Relay item {} finished without a result",
                seq
            ))),
        }
    }
}
