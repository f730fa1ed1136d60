//! HTTP API Layer
//!
//! Serves the paced map proxy and a health endpoint over axum.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{router, HttpServer, HttpServerConfig, ServerHandle};
