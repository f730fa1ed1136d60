// Application Layer - Use Cases and Business Logic

pub mod map_proxy;
pub mod paced_queue;

// Re-exports
pub use map_proxy::{relay_item, MapProxyService, RelayReceiver};
pub use paced_queue::PacedQueue;
