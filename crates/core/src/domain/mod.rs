// Domain Layer - Queue entities and errors

pub mod error;
pub mod item;
pub mod queue;

// Re-exports
pub use error::{ItemError, QueueError};
pub use item::{ItemOutcome, QueueItem};
pub use queue::{QueueConfig, QueueId, QueueStats};
