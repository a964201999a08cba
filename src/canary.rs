//! Canary run wiring: probe, submit metrics, persist the log record

use crate::config::Config;
use crate::coordinator::{RunCoordinator, RunResult, RunSummary};
use crate::errors::{CanaryError, Result};
use crate::metrics::{HttpMetricsSink, MetricsSink, TracingMetricsSink};
use crate::probe::{HttpProber, Prober};
use crate::report::Reporter;
use crate::store::{FsLogStore, HttpLogStore, LogStore};
use crate::target::TargetSet;

use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Everything one run produced. Metric and store failures are carried
/// here rather than failing the run.
#[derive(Debug)]
pub struct RunReport {
    pub result: RunResult,
    pub summary: RunSummary,
    pub log_key: Result<String>,
}

pub struct Canary {
    coordinator: RunCoordinator,
    reporter: Reporter,
}

impl Canary {
    /// Build the canary with HTTP probing and the sink and store the
    /// configuration selects
    pub fn new(config: Config) -> Result<Self> {
        config.validate().map_err(CanaryError::Config)?;

        let prober = Arc::new(HttpProber::new(config.probe_timeout)?);

        let sink: Arc<dyn MetricsSink> = match &config.metrics_url {
            Some(url) => Arc::new(HttpMetricsSink::new(url.clone(), config.http_timeout)?),
            None => Arc::new(TracingMetricsSink),
        };

        let store: Arc<dyn LogStore> = match &config.log_store_url {
            Some(url) => Arc::new(HttpLogStore::new(url.clone(), config.http_timeout)?),
            None => Arc::new(FsLogStore::new(&config.log_store_root)),
        };

        info!(
            "Canary configured - bucket: {}, namespace: {}, metrics: {}, concurrency: {}",
            config.log_bucket,
            config.metrics_namespace,
            config.metrics_url.as_deref().unwrap_or("log"),
            config.probe_concurrency
        );

        Ok(Self::from_parts(prober, sink, store, &config))
    }

    pub fn from_parts(
        prober: Arc<dyn Prober>,
        sink: Arc<dyn MetricsSink>,
        store: Arc<dyn LogStore>,
        config: &Config,
    ) -> Self {
        let coordinator = RunCoordinator::new(prober, sink)
            .with_namespace(config.metrics_namespace.clone())
            .with_concurrency(config.probe_concurrency);

        Self {
            coordinator,
            reporter: Reporter::new(store, config.log_bucket.clone()),
        }
    }

    /// Execute one run. Always completes; failures are logged and reported
    /// in the returned `RunReport`.
    #[instrument(skip(self, targets))]
    pub async fn run(&self, targets: &TargetSet) -> RunReport {
        let result = self.coordinator.run_once(targets).await;
        let summary = result.summary();

        let log_key = self.reporter.report(&result).await;
        match &log_key {
            Ok(key) => info!(
                "Run {} complete - {}/{} available, log {}/{}",
                result.run_id,
                summary.available_count,
                summary.total_count,
                self.reporter.bucket(),
                key
            ),
            Err(e) => warn!(
                "Run {} complete - {}/{} available, log not persisted: {}",
                result.run_id, summary.available_count, summary.total_count, e
            ),
        }

        if !result.metric_failures.is_empty() {
            warn!(
                "Run {} had {} failed metric submissions",
                result.run_id,
                result.metric_failures.len()
            );
        }

        RunReport {
            result,
            summary,
            log_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Canary::new(Config::default());
        assert!(matches!(result, Err(CanaryError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_with_fs_store_and_tracing_sink() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            log_bucket: "canary".to_string(),
            log_store_root: dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        };

        let canary = Canary::new(config).unwrap();
        let report = canary.run(&TargetSet::new()).await;

        let key = report.log_key.unwrap();
        let body = std::fs::read_to_string(dir.path().join("canary").join(&key)).unwrap();
        assert_eq!(body, "");
        assert_eq!(report.summary.total_count, 0);
        assert!(report.result.metric_failures.is_empty());
    }

    #[tokio::test]
    async fn test_consecutive_runs_each_keep_their_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            log_bucket: "canary".to_string(),
            log_store_root: dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        };
        let canary = Canary::new(config).unwrap();

        for _ in 0..20 {
            let report = canary.run(&TargetSet::new()).await;
            assert!(report.log_key.is_ok());
        }

        let stored = std::fs::read_dir(dir.path().join("canary").join("logs")).unwrap().count();
        assert_eq!(stored, 20);
    }
}
