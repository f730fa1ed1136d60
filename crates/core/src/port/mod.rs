// Port Layer - Interfaces for external dependencies

pub mod upstream;

// Re-exports
pub use upstream::{UpstreamError, UpstreamFetcher, UpstreamRequest, UpstreamResponse};
