//! Single bounded-time reachability check against one URL

use crate::errors::{CanaryError, Result};
use reqwest::{Client, redirect};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Available,
    Unavailable,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Available => write!(f, "available"),
            ProbeStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub latency_ms: u64,
    /// Response status, absent when no response arrived
    pub status_code: Option<u16>,
    /// Transport error or unexpected status, for diagnostics only
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn available(latency_ms: u64, status_code: u16) -> Self {
        Self {
            status: ProbeStatus::Available,
            latency_ms,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn unavailable(latency_ms: u64, status_code: Option<u16>, error: String) -> Self {
        Self {
            status: ProbeStatus::Unavailable,
            latency_ms,
            status_code,
            error: Some(error),
        }
    }
}

/// Performs one reachability check. Implementations never fail; every
/// failure mode resolves to an `Unavailable` outcome.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP(S) prober issuing a single GET per check
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(probe_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(probe_timeout)
            .redirect(redirect::Policy::none())
            .user_agent(format!("canary/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CanaryError::Http)?;

        Ok(Self::with_client(client, probe_timeout))
    }

    pub fn with_client(client: Client, probe_timeout: Duration) -> Self {
        Self {
            client,
            timeout: probe_timeout,
        }
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();

        let response = timeout(self.timeout, self.client.get(url).send()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let outcome = match response {
            Err(_) => ProbeOutcome::unavailable(
                latency_ms,
                None,
                format!("timed out after {}ms", self.timeout.as_millis()),
            ),
            Ok(Err(e)) => ProbeOutcome::unavailable(latency_ms, None, e.to_string()),
            Ok(Ok(response)) => {
                let code = response.status().as_u16();
                if (200..300).contains(&code) {
                    ProbeOutcome::available(latency_ms, code)
                } else {
                    ProbeOutcome::unavailable(
                        latency_ms,
                        Some(code),
                        format!("unexpected status {}", response.status()),
                    )
                }
            }
        };

        debug!(
            url,
            status = %outcome.status,
            latency_ms = outcome.latency_ms,
            status_code = ?outcome.status_code,
            error = ?outcome.error,
            "probe finished"
        );

        outcome
    }
}
