// Queue Domain Model

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue identifier (used in logs only)
pub type QueueId = String;

/// Maximum number of waiting items before producers are rejected
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed wait after every executed item (100ms)
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: QueueId,
    pub capacity: usize,
    pub pacing: Duration,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, capacity: usize, pacing: Duration) -> Self {
        Self {
            name: name.into(),
            capacity,
            pacing,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new("map-proxy", DEFAULT_CAPACITY, DEFAULT_PACING)
    }
}

/// Point-in-time view of a queue (for health reporting)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub name: QueueId,
    pub size: usize,
    pub processing: bool,
    pub capacity: usize,
    pub pacing_ms: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub succeeded: u64,
    pub failed: u64,
}
