//! Metric samples and the sinks that accept them

use crate::errors::{CanaryError, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

pub const DEFAULT_NAMESPACE: &str = "LambdaFunctionMetrics";
pub const AVAILABLE_URL_COUNT: &str = "AvailableURLCount";
pub const URL_LATENCY: &str = "URLLatency";
pub const URL_DIMENSION: &str = "URL";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MetricUnit {
    Milliseconds,
    Count,
}

impl std::fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricUnit::Milliseconds => write!(f, "Milliseconds"),
            MetricUnit::Count => write!(f, "Count"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricSample {
    pub namespace: String,
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub dimensions: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(namespace: &str, name: &str, value: f64, unit: MetricUnit) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            value,
            unit,
            dimensions: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Per-target latency, dimensioned by target name
    pub fn latency(namespace: &str, target: &str, latency_ms: u64) -> Self {
        Self::new(namespace, URL_LATENCY, latency_ms as f64, MetricUnit::Milliseconds)
            .with_dimension(URL_DIMENSION, target)
    }

    /// Number of targets found available in one run
    pub fn available_count(namespace: &str, count: usize) -> Self {
        Self::new(namespace, AVAILABLE_URL_COUNT, count as f64, MetricUnit::Count)
    }

    pub fn with_dimension(mut self, key: &str, value: &str) -> Self {
        self.dimensions.insert(key.to_string(), value.to_string());
        self
    }
}

/// Destination for metric samples. Submissions are fire-and-forget: one
/// attempt, and the caller decides what a failure means.
#[async_trait::async_trait]
pub trait MetricsSink: Send + Sync {
    async fn submit(&self, sample: &MetricSample) -> Result<()>;
}

/// Emits samples as structured log events
#[derive(Debug, Clone, Default)]
pub struct TracingMetricsSink;

#[async_trait::async_trait]
impl MetricsSink for TracingMetricsSink {
    async fn submit(&self, sample: &MetricSample) -> Result<()> {
        let dimensions = serde_json::to_string(&sample.dimensions)?;

        info!(
            target: "canary::metrics",
            namespace = %sample.namespace,
            metric = %sample.name,
            value = sample.value,
            unit = %sample.unit,
            dimensions = %dimensions,
            timestamp = sample.timestamp.timestamp_millis(),
            "metric"
        );

        Ok(())
    }
}

/// Request body accepted by the metrics gateway
#[derive(Debug, Serialize)]
struct PutMetricData<'a> {
    namespace: &'a str,
    metric_data: Vec<MetricDatum<'a>>,
}

#[derive(Debug, Serialize)]
struct MetricDatum<'a> {
    metric_name: &'a str,
    value: f64,
    unit: MetricUnit,
    dimensions: Vec<Dimension<'a>>,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
struct Dimension<'a> {
    name: &'a str,
    value: &'a str,
}

impl<'a> From<&'a MetricSample> for PutMetricData<'a> {
    fn from(sample: &'a MetricSample) -> Self {
        Self {
            namespace: &sample.namespace,
            metric_data: vec![MetricDatum {
                metric_name: &sample.name,
                value: sample.value,
                unit: sample.unit,
                dimensions: sample
                    .dimensions
                    .iter()
                    .map(|(name, value)| Dimension { name, value })
                    .collect(),
                timestamp: sample.timestamp.timestamp_millis(),
            }],
        }
    }
}

/// HTTP sink posting each sample to a metrics gateway
#[derive(Debug, Clone)]
pub struct HttpMetricsSink {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpMetricsSink {
    pub fn new(endpoint: String, http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("canary/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CanaryError::Http)?;

        Ok(Self {
            client,
            endpoint,
            timeout: http_timeout,
        })
    }

    async fn handle_response(&self, response: Response, metric: &str) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            debug!("Metric {} accepted by gateway", metric);
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        let error_message = match status.as_u16() {
            400 => format!("Bad request for metric {}: {}", metric, error_body),
            401 | 403 => format!("Not authorized to put metric {}: {}", metric, error_body),
            404 => format!("Metrics endpoint not found for {}: {}", metric, error_body),
            429 => format!("Throttled putting metric {}: {}", metric, error_body),
            500..=599 => format!("Metrics gateway error for {}: {}", metric, error_body),
            _ => format!("Unexpected response {} for metric {}: {}", status, metric, error_body),
        };

        Err(CanaryError::Metrics(error_message))
    }
}

#[async_trait::async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn submit(&self, sample: &MetricSample) -> Result<()> {
        let url = format!("{}/v1/metrics", self.endpoint);
        let body = PutMetricData::from(sample);

        let response = timeout(self.timeout, self.client.post(&url).json(&body).send())
            .await
            .map_err(|_| CanaryError::Metrics(format!("Timed out putting metric {}", sample.name)))?
            .map_err(CanaryError::Http)?;

        self.handle_response(response, &sample.name).await
    }
}
