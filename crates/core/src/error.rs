// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Queue error: {0}")]
    Queue(#[from] crate::domain::QueueError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] crate::port::UpstreamError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the caller should retry later (queue at capacity)
    pub fn is_queue_full(&self) -> bool {
        matches!(self, AppError::Queue(crate::domain::QueueError::Full { .. }))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
