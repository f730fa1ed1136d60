//! Route Handlers

use crate::error::ApiError;
use crate::types::HealthResponse;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use tilepace_core::application::MapProxyService;
use tilepace_core::port::UpstreamRequest;
use tracing::warn;

/// Shared handler state
pub struct ApiState {
    pub service: Arc<MapProxyService>,
    pub start_time: Instant,
}

impl ApiState {
    pub fn new(service: Arc<MapProxyService>) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

/// GET /map-proxy/{*path}
///
/// Queues one paced upstream fetch and relays its status and body as JSON.
pub async fn map_proxy(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let upstream = state
        .service
        .proxy(UpstreamRequest::new(path, query))
        .await?;

    let status = StatusCode::from_u16(upstream.status).unwrap_or_else(|_| {
        warn!(status = upstream.status, "Upstream sent an invalid status code");
        StatusCode::BAD_GATEWAY
    });

    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json")],
        upstream.body,
    )
        .into_response())
}

/// GET /health
pub async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: tilepace_core::VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        queue: state.service.stats(),
    })
}
