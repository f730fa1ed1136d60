//! HTTP Error Mapping
//!
//! Maps application errors to HTTP status codes and a JSON error body.

use crate::types::{ErrorBody, ErrorDetail};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tilepace_core::domain::QueueError;
use tilepace_core::error::AppError;
use tilepace_core::port::UpstreamError;
use tracing::error;

/// Error codes carried in the JSON body
pub mod code {
    pub const QUEUE_FULL: &str = "queue_full";
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
    pub const UPSTREAM_TIMEOUT: &str = "upstream_timeout";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Seconds a rejected caller is told to wait before retrying
pub const RETRY_AFTER_SECS: u64 = 1;

/// Error returned by route handlers
#[derive(Error, Debug)]
#[error(transparent)]
pub struct ApiError(#[from] pub AppError);

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::Queue(QueueError::Full { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, code::QUEUE_FULL)
            }
            AppError::Upstream(UpstreamError::InvalidUrl(_)) => {
                (StatusCode::BAD_REQUEST, code::INVALID_REQUEST)
            }
            AppError::Upstream(UpstreamError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, code::UPSTREAM_TIMEOUT)
            }
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, code::UPSTREAM_UNAVAILABLE),
            AppError::Io(_) | AppError::Config(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, code::INTERNAL_ERROR)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(status = %status, error = %self.0, "Request failed");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: error_code.to_string(),
                message: self.0.to_string(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if error_code == code::QUEUE_FULL {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(RETRY_AFTER_SECS),
            );
        }
        response
    }
}
