//! Configuration management for the canary

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::metrics::DEFAULT_NAMESPACE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bucket (or container) that receives run log records
    pub log_bucket: String,

    /// Root directory for the filesystem log store
    pub log_store_root: String,

    /// Endpoint of an HTTP object store; takes precedence over the filesystem root
    pub log_store_url: Option<String>,

    /// Endpoint of the metrics gateway; metrics are logged when unset
    pub metrics_url: Option<String>,

    /// Namespace every metric sample is submitted under
    pub metrics_namespace: String,

    /// Upper bound on a single probe, including connect and TLS
    pub probe_timeout: Duration,

    /// Timeout for metrics and log store requests
    pub http_timeout: Duration,

    /// Number of targets probed at once
    pub probe_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_bucket: String::new(),
            log_store_root: "./canary-logs".to_string(),
            log_store_url: None,
            metrics_url: None,
            metrics_namespace: DEFAULT_NAMESPACE.to_string(),
            probe_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            probe_concurrency: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(bucket) = lookup("LOG_BUCKET") {
            config.log_bucket = bucket.trim().to_string();
        }

        if let Some(root) = lookup("LOG_STORE_ROOT") {
            config.log_store_root = root;
        }

        if let Some(url) = lookup("LOG_STORE_URL").filter(|u| !u.trim().is_empty()) {
            config.log_store_url = Some(url.trim_end_matches('/').to_string());
        }

        if let Some(url) = lookup("METRICS_URL").filter(|u| !u.trim().is_empty()) {
            config.metrics_url = Some(url.trim_end_matches('/').to_string());
        }

        if let Some(namespace) = lookup("METRICS_NAMESPACE") {
            config.metrics_namespace = namespace;
        }

        if let Some(timeout) = lookup("PROBE_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.probe_timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(concurrency) = lookup("PROBE_CONCURRENCY") {
            if let Ok(n) = concurrency.parse() {
                config.probe_concurrency = n;
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.log_bucket.is_empty() {
            return Err("LOG_BUCKET cannot be empty".to_string());
        }

        if self.log_store_url.is_none() && self.log_store_root.is_empty() {
            return Err("either LOG_STORE_URL or LOG_STORE_ROOT must be set".to_string());
        }

        if self.metrics_namespace.is_empty() {
            return Err("metrics_namespace cannot be empty".to_string());
        }

        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }

        if self.probe_concurrency == 0 {
            return Err("probe_concurrency must be greater than 0".to_string());
        }

        Ok(())
    }
}
