//! Decision counters kept by the engine

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Outcome of one `authorize` or `evaluate_claim` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    Allowed,
    Denied,
    /// Failed before a decision could be made
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineMetrics {
    pub total_requests: u64,
    pub allowed_decisions: u64,
    pub denied_decisions: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    allowed: AtomicU64,
    denied: AtomicU64,
    failed: AtomicU64,
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: DecisionOutcome, latency: Duration) {
        let counter = match outcome {
            DecisionOutcome::Allowed => &self.allowed,
            DecisionOutcome::Denied => &self.denied,
            DecisionOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us.fetch_add(micros, Ordering::Relaxed);
        self.max_latency_us.fetch_max(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineMetrics {
        let allowed_decisions = self.allowed.load(Ordering::Relaxed);
        let denied_decisions = self.denied.load(Ordering::Relaxed);
        let error_count = self.failed.load(Ordering::Relaxed);
        let total_requests = allowed_decisions + denied_decisions + error_count;

        let avg_latency_ms = if total_requests == 0 {
            0.0
        } else {
            self.total_latency_us.load(Ordering::Relaxed) as f64 / total_requests as f64 / 1000.0
        };

        EngineMetrics {
            total_requests,
            allowed_decisions,
            denied_decisions,
            error_count,
            avg_latency_ms,
            max_latency_ms: self.max_latency_us.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_are_counted_separately() {
        let collector = MetricsCollector::new();
        collector.record(DecisionOutcome::Allowed, Duration::from_millis(2));
        collector.record(DecisionOutcome::Denied, Duration::from_millis(4));
        collector.record(DecisionOutcome::Allowed, Duration::from_millis(2));
        collector.record(DecisionOutcome::Failed, Duration::from_millis(8));

        let metrics = collector.snapshot();
        assert_eq!(metrics.total_requests, 4);
        assert_eq!(metrics.allowed_decisions, 2);
        assert_eq!(metrics.denied_decisions, 1);
        assert_eq!(metrics.error_count, 1);
        assert!((metrics.avg_latency_ms - 4.0).abs() < 1e-9);
        assert!((metrics.max_latency_ms - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_collector() {
        assert_eq!(MetricsCollector::new().snapshot(), EngineMetrics::default());
    }
}
