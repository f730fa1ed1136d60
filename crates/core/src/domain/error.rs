// Domain Error Types

use thiserror::Error;

/// Errors raised by the queue store itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is full ({capacity} items), try again later")]
    Full { capacity: usize },
}

/// Failure of a single queue item
///
/// Never stored in queue state; the drain loop logs and counts it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("Item failed: {0}")]
    Failed(String),

    #[error("Item panicked: {0}")]
    Panicked(String),
}
