// Reqwest upstream implementation
// reason: reqwest for the outbound HTTP client, tokio runtime underneath
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use tilepace_core::error::{AppError, Result};
use tilepace_core::port::{UpstreamError, UpstreamFetcher, UpstreamRequest, UpstreamResponse};

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Upstream connection settings
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL every proxied path is resolved under
    pub base_url: String,
    /// Provider token appended as `access_token` when the caller did not send one
    pub access_token: Option<String>,
    /// Total timeout for one outbound request (connect + body)
    pub timeout: Duration,
}

/// Upstream fetcher backed by a shared reqwest client
pub struct ReqwestUpstream {
    client: Client,
    base: Url,
    access_token: Option<String>,
    timeout: Duration,
}

impl ReqwestUpstream {
    /// Create a new upstream client
    ///
    /// # Errors
    /// - AppError::Config if the base URL is not an absolute http(s) URL or the
    ///   client cannot be built
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let base = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            AppError::Config(format!("Invalid upstream URL {}: {}", config.base_url, e))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(AppError::Config(format!(
                "Upstream URL must be http or https: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            access_token: config.access_token,
            timeout: config.timeout,
        })
    }

    /// Resolve a proxied request into an absolute upstream URL
    ///
    /// `request.path` arrives percent-decoded, so each segment is re-encoded
    /// on its own; a literal `?` or `#` stays part of the path. Dot segments
    /// are resolved against the request path and may not climb above the base.
    fn build_url(&self, request: &UpstreamRequest) -> std::result::Result<Url, UpstreamError> {
        let mut segments: Vec<&str> = Vec::new();
        for segment in request.path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(UpstreamError::InvalidUrl(format!(
                            "{} escapes the upstream base",
                            request.path
                        )));
                    }
                }
                _ => segments.push(segment),
            }
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(format!("{} cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);

        url.set_query(request.query.as_deref().filter(|q| !q.is_empty()));

        if let Some(token) = &self.access_token {
            let has_token = url.query_pairs().any(|(key, _)| key == ACCESS_TOKEN_PARAM);
            if !has_token {
                url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
            }
        }

        Ok(url)
    }

    fn classify(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(millis(self.timeout))
        } else {
            UpstreamError::Connection(err.to_string())
        }
    }
}

/// Whole milliseconds, saturating for durations beyond `u64::MAX` ms
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl UpstreamFetcher for ReqwestUpstream {
    async fn fetch(
        &self,
        request: &UpstreamRequest,
    ) -> std::result::Result<UpstreamResponse, UpstreamError> {
        let url = self.build_url(request)?;
        debug!(path = %request.path, "Fetching from upstream");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            warn!(path = %request.path, status, "Upstream returned non-success status");
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(millis(self.timeout))
            } else {
                UpstreamError::Body(e.to_string())
            }
        })?;

        debug!(path = %request.path, status, bytes = body.len(), "Upstream response received");

        Ok(UpstreamResponse {
            status,
            body: body.to_vec(),
        })
    }
}
