// Tilepace Infrastructure - HTTP Adapters
// Implements: UpstreamFetcher

pub mod reqwest_upstream;

pub use reqwest_upstream::{ReqwestUpstream, UpstreamConfig};
