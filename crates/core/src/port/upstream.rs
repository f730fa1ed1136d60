// Upstream Port
// Abstraction over the third-party map/style HTTP API

use async_trait::async_trait;
use thiserror::Error;

/// Outbound request, relative to the configured upstream base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Path below the upstream base, without leading slash (e.g. `styles/v1/acme/streets`)
    pub path: String,
    /// Raw query string as received, without the leading `?`
    pub query: Option<String>,
}

impl UpstreamRequest {
    pub fn new(path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }
}

/// Relayed upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level upstream failures
///
/// A non-2xx status is not an error here; it is relayed to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream connection failed: {0}")]
    Connection(String),

    #[error("Upstream timed out after {0}ms")]
    Timeout(u64),

    #[error("Failed to read upstream body: {0}")]
    Body(String),
}

/// Upstream fetcher trait
///
/// Implementations:
/// - ReqwestUpstream (infra-http): real HTTP client
/// - MockUpstream: canned responses for tests
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Perform one outbound GET and return status + body
    ///
    /// # Errors
    /// - UpstreamError::InvalidUrl if the request cannot be turned into a URL
    /// - UpstreamError::Connection / Timeout on transport failure
    /// - UpstreamError::Body if the body cannot be read
    async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock upstream behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Respond with status and body
        Respond(u16, String),
        /// Respond after a delay
        Delayed(Duration, u16, String),
        /// Fail with a connection error
        Fail(String),
    }

    /// Mock upstream that records every request it receives
    pub struct MockUpstream {
        behavior: MockBehavior,
        requests: Arc<Mutex<Vec<UpstreamRequest>>>,
    }

    impl MockUpstream {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_ok(body: impl Into<String>) -> Self {
            Self::new(MockBehavior::Respond(200, body.into()))
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<UpstreamRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamFetcher for MockUpstream {
        async fn fetch(
            &self,
            request: &UpstreamRequest,
        ) -> Result<UpstreamResponse, UpstreamError> {
            self.requests.lock().unwrap().push(request.clone());

            match self.behavior.clone() {
                MockBehavior::Respond(status, body) => Ok(UpstreamResponse {
                    status,
                    body: body.into_bytes(),
                }),
                MockBehavior::Delayed(delay, status, body) => {
                    tokio::time::sleep(delay).await;
                    Ok(UpstreamResponse {
                        status,
                        body: body.into_bytes(),
                    })
                }
                MockBehavior::Fail(msg) => Err(UpstreamError::Connection(msg)),
            }
        }
    }
}
