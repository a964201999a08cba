//! Drives one canary run over a target set

use crate::metrics::{MetricSample, MetricsSink, AVAILABLE_URL_COUNT, DEFAULT_NAMESPACE, URL_LATENCY};
use crate::probe::{ProbeStatus, Prober};
use crate::target::{Target, TargetSet};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Outcome of probing one target
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunEntry {
    pub name: String,
    pub url: String,
    pub status: ProbeStatus,
    pub latency_ms: u64,
}

/// A metric submission the sink did not accept
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricFailure {
    pub metric: String,
    /// Target the sample belonged to; `None` for the run aggregate
    pub target: Option<String>,
    pub error: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    /// One entry per target, in input order
    pub entries: Vec<RunEntry>,
    pub metric_failures: Vec<MetricFailure>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub available_count: usize,
    pub total_count: usize,
}

impl RunResult {
    pub fn new(entries: Vec<RunEntry>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entries,
            metric_failures: Vec::new(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            available_count: self
                .entries
                .iter()
                .filter(|e| e.status == ProbeStatus::Available)
                .count(),
            total_count: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct RunCoordinator {
    prober: Arc<dyn Prober>,
    sink: Arc<dyn MetricsSink>,
    namespace: String,
    concurrency: usize,
}

impl RunCoordinator {
    pub fn new(prober: Arc<dyn Prober>, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            prober,
            sink,
            namespace: DEFAULT_NAMESPACE.to_string(),
            concurrency: 1,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Probe up to `concurrency` targets at once. 1 keeps the run strictly
    /// sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Probe every target once, submitting a latency sample as each probe
    /// completes and the availability count once all have completed.
    #[instrument(skip(self, targets), fields(targets = targets.len()))]
    pub async fn run_once(&self, targets: &TargetSet) -> RunResult {
        // `buffered` yields in input order and starts at most `concurrency`
        // probes at a time
        let checked: Vec<(RunEntry, Option<MetricFailure>)> = stream::iter(targets.iter())
            .map(|target| self.check_target(target))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut result = RunResult::new(Vec::with_capacity(checked.len()));
        for (entry, failure) in checked {
            result.entries.push(entry);
            result.metric_failures.extend(failure);
        }

        let summary = result.summary();
        let aggregate = MetricSample::available_count(&self.namespace, summary.available_count);
        if let Err(e) = self.sink.submit(&aggregate).await {
            warn!("Failed to submit {}: {}", AVAILABLE_URL_COUNT, e);
            result.metric_failures.push(MetricFailure {
                metric: AVAILABLE_URL_COUNT.to_string(),
                target: None,
                error: e.to_string(),
            });
        }

        result
    }

    async fn check_target(&self, target: &Target) -> (RunEntry, Option<MetricFailure>) {
        let outcome = self.prober.probe(&target.url).await;

        debug!(
            "Probed {} ({}): {} in {}ms",
            target.name, target.url, outcome.status, outcome.latency_ms
        );

        let sample = MetricSample::latency(&self.namespace, &target.name, outcome.latency_ms);
        let failure = match self.sink.submit(&sample).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to submit {} for {}: {}", URL_LATENCY, target.name, e);
                Some(MetricFailure {
                    metric: URL_LATENCY.to_string(),
                    target: Some(target.name.clone()),
                    error: e.to_string(),
                })
            }
        };

        let entry = RunEntry {
            name: target.name.clone(),
            url: target.url.clone(),
            status: outcome.status,
            latency_ms: outcome.latency_ms,
        };

        (entry, failure)
    }
}
