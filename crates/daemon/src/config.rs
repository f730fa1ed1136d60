//! Daemon configuration, read once from the environment at startup

use std::time::Duration;
use tilepace_api_http::HttpServerConfig;
use tilepace_core::error::{AppError, Result};
use tilepace_infra_http::UpstreamConfig;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;
const DEFAULT_UPSTREAM_URL: &str = "https://api.mapbox.com";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub http: HttpServerConfig,
    pub upstream: UpstreamConfig,
    pub log_format: LogFormat,
    pub shutdown_grace: Duration,
}

impl DaemonConfig {
    /// Load configuration from `TILEPACE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("TILEPACE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "TILEPACE_PORT", DEFAULT_PORT)?;

        let base_url =
            lookup("TILEPACE_UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let access_token = lookup("TILEPACE_UPSTREAM_TOKEN").filter(|t| !t.trim().is_empty());
        let timeout_secs = parse_or(
            &lookup,
            "TILEPACE_UPSTREAM_TIMEOUT_SECS",
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(AppError::Config(
                "TILEPACE_UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        let log_format = match lookup("TILEPACE_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "TILEPACE_LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                    other
                )))
            }
        };

        let grace_secs = parse_or(
            &lookup,
            "TILEPACE_SHUTDOWN_GRACE_SECS",
            DEFAULT_SHUTDOWN_GRACE_SECS,
        )?;

        Ok(Self {
            http: HttpServerConfig { host, port },
            upstream: UpstreamConfig {
                base_url,
                access_token,
                timeout: Duration::from_secs(timeout_secs),
            },
            log_format,
            shutdown_grace: Duration::from_secs(grace_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: '{}'", key, raw))),
    }
}
