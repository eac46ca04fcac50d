//! Garbage collection of overdue ephemeral artifacts
//!
//! The collector runs for the lifetime of the process. Each cycle lists
//! every artifact name downstream, keeps the overdue ones and deletes them
//! in batches spread over the cycle period so the downstream system never
//! sees a burst. An unreachable downstream only delays the next attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info, warn};

use super::naming;
use super::rule::ArtifactPolicy;
use crate::error::{AuthzError, Result};

/// Downstream system holding ephemeral artifacts
#[async_trait]
pub trait ArtifactApi: Send + Sync {
    /// Every artifact name, ephemeral or not
    async fn list_artifact_names(&self) -> Result<Vec<String>>;

    async fn delete_artifact(&self, name: &str) -> Result<()>;

    async fn create_artifact(&self, artifact: &ArtifactPolicy) -> Result<()>;
}

/// Collector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Target duration of one cycle
    #[serde(with = "crate::duration::serde_secs")]
    pub period: Duration,

    pub batch_size: usize,

    /// Wait before retrying an unreachable downstream
    #[serde(with = "crate::duration::serde_secs")]
    pub unreachable_backoff: Duration,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(300),
            batch_size: 50,
            unreachable_backoff: Duration::from_secs(30),
        }
    }
}

/// Counts for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub listed: usize,
    pub overdue: usize,
    pub deleted: usize,
    pub failed: usize,
    pub batches: usize,
}

pub struct ArtifactCollector {
    api: Arc<dyn ArtifactApi>,
    config: GcConfig,
}

impl ArtifactCollector {
    pub fn new(api: Arc<dyn ArtifactApi>, config: GcConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Start the collector on the current runtime and forget about it
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run cycles forever, one per period
    pub async fn run(&self) {
        info!(
            "artifact collector started, period={:?}, batch_size={}",
            self.config.period, self.config.batch_size
        );
        loop {
            let next_cycle = Instant::now() + self.config.period;
            match self.sweep_once(Utc::now()).await {
                Ok(report) => {
                    debug!(?report, "collector cycle finished");
                    sleep_until(next_cycle).await;
                }
                Err(e) => {
                    warn!("{}, retrying in {:?}", e, self.config.unreachable_backoff);
                    sleep(self.config.unreachable_backoff).await;
                }
            }
        }
    }

    /// One cycle: list, keep the overdue names, delete them paced
    ///
    /// Fails only when the listing fails; deletion failures are counted.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let names = self
            .api
            .list_artifact_names()
            .await
            .map_err(|e| AuthzError::DownstreamUnavailable(format!("listing artifacts: {}", e)))?;

        let overdue = collect_overdue(&names, now);
        let mut report = SweepReport {
            listed: names.len(),
            overdue: overdue.len(),
            ..Default::default()
        };
        self.delete_overdue(&overdue, &mut report).await;
        Ok(report)
    }

    /// Delete in batches of `batch_size`, pausing between batches
    ///
    /// The first batch is timed. The remaining pause budget is
    /// `period - batch_time * batches`, half of it spread evenly between
    /// batches. With no budget left the batches run back to back.
    pub async fn delete_overdue(&self, names: &[String], report: &mut SweepReport) {
        if names.is_empty() {
            info!("no overdue artifacts to delete");
            return;
        }
        let batch_size = self.config.batch_size.max(1);
        if names.len() < batch_size {
            self.delete_batch(names, report).await;
            return;
        }

        let mut batches = names.chunks(batch_size);
        let batch_count = batches.len() as u32;
        let started = Instant::now();
        if let Some(first) = batches.next() {
            self.delete_batch(first, report).await;
        }
        let pause = batch_pause(self.config.period, started.elapsed(), batch_count);
        debug!(batches = batch_count, ?pause, "pacing artifact deletion");

        for batch in batches {
            if !pause.is_zero() {
                sleep(pause).await;
            }
            self.delete_batch(batch, report).await;
        }
    }

    async fn delete_batch(&self, names: &[String], report: &mut SweepReport) {
        let mut deleted = 0;
        let mut failed = 0;
        for name in names {
            match self.api.delete_artifact(name).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    failed += 1;
                    error!("deleting artifact '{}': {}", name, e);
                }
            }
        }
        report.batches += 1;
        report.deleted += deleted;
        report.failed += failed;
        info!("deleted {} overdue artifacts, {} deletions failed", deleted, failed);
    }
}

/// Names whose embedded expiry lies before `now`, in listing order
pub fn collect_overdue(names: &[String], now: DateTime<Utc>) -> Vec<String> {
    names
        .iter()
        .filter(|name| match naming::is_overdue(name, now) {
            Ok(overdue) => overdue,
            Err(e) => {
                error!("checking artifact for overdue: {}", e);
                false
            }
        })
        .cloned()
        .collect()
}

/// Pause between consecutive batches
pub fn batch_pause(period: Duration, batch_time: Duration, batch_count: u32) -> Duration {
    if batch_count == 0 {
        return Duration::ZERO;
    }
    period
        .checked_sub(batch_time.saturating_mul(batch_count))
        .map(|budget| budget / (2 * batch_count))
        .unwrap_or(Duration::ZERO)
}
