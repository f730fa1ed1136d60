// Queue Item - a deferred, anonymous unit of work

use super::error::ItemError;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// Result of running one item
pub type ItemOutcome = std::result::Result<(), ItemError>;

/// Deferred unit of work
///
/// Wraps a future that has not been polled yet. Nothing runs until the drain
/// loop executes the item, and the item is consumed by execution.
pub struct QueueItem {
    task: BoxFuture<'static, ItemOutcome>,
}

impl QueueItem {
    pub fn new<F>(task: F) -> Self
    where
        F: Future<Output = ItemOutcome> + Send + 'static,
    {
        Self {
            task: Box::pin(task),
        }
    }

    pub(crate) fn into_future(self) -> BoxFuture<'static, ItemOutcome> {
        self.task
    }
}

impl fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueItem").finish_non_exhaustive()
    }
}
