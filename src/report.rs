//! Rendering and persistence of the per-run log record

use crate::coordinator::{RunEntry, RunResult};
use crate::errors::{CanaryError, Result};
use crate::store::LogStore;

use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, instrument};

pub const LOG_PREFIX: &str = "logs/";

/// Keys tried per record before giving up on a crowded millisecond
const MAX_KEY_ATTEMPTS: usize = 5;

/// Render one entry as a log record line
pub fn render_entry(entry: &RunEntry) -> String {
    format!(
        "Name: {}, URL: {}, Status: {}, Latency: {}ms",
        entry.name, entry.url, entry.status, entry.latency_ms
    )
}

/// Render a run as newline-separated lines in entry order. An empty run
/// renders as an empty body.
pub fn render(result: &RunResult) -> String {
    result
        .entries
        .iter()
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Storage key for a record persisted at `epoch_ms`
pub fn log_key(epoch_ms: i64) -> String {
    format!("{}{}.txt", LOG_PREFIX, epoch_ms)
}

pub struct Reporter {
    store: Arc<dyn LogStore>,
    bucket: String,
    /// Last millisecond handed out as a key
    last_epoch_ms: AtomicI64,
}

impl Reporter {
    pub fn new(store: Arc<dyn LogStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            last_epoch_ms: AtomicI64::new(i64::MIN),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Current millisecond, or one past the last key issued if that is later
    fn next_epoch_ms(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_epoch_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }

    /// Persist the rendered run and return the key it was stored under.
    ///
    /// Records are never overwritten. Each call takes a millisecond no
    /// earlier call on this reporter has used, and if the store already
    /// holds that key (another writer) a later millisecond is tried.
    #[instrument(skip(self, result), fields(run_id = %result.run_id))]
    pub async fn report(&self, result: &RunResult) -> Result<String> {
        let body = render(result).into_bytes();

        let mut last_error = None;
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = log_key(self.next_epoch_ms());

            match self.store.put(&self.bucket, &key, body.clone()).await {
                Ok(()) => {
                    debug!("Persisted run log to {}/{}", self.bucket, key);
                    return Ok(key);
                }
                Err(CanaryError::AlreadyExists(existing)) => {
                    debug!("{} already exists, trying next key", existing);
                    last_error = Some(CanaryError::AlreadyExists(existing));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| CanaryError::Store("no key attempted".to_string())))
    }
}
