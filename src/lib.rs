//! Synthetic monitoring canary
//!
//! Probes a set of named URLs once per run, submits latency and
//! availability metrics, and persists a human-readable run log.

pub mod canary;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod metrics;
pub mod probe;
pub mod report;
pub mod store;
pub mod target;

pub use canary::{Canary, RunReport};
pub use config::Config;
pub use coordinator::{MetricFailure, RunCoordinator, RunEntry, RunResult, RunSummary};
pub use errors::{CanaryError, Result};
pub use metrics::{MetricSample, MetricUnit, MetricsSink};
pub use probe::{HttpProber, ProbeOutcome, ProbeStatus, Prober};
pub use report::Reporter;
pub use store::LogStore;
pub use target::{Target, TargetSet};
