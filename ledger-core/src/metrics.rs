//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_commits_total` - Total number of committed transactions
//! - `ledger_commit_writes` - Histogram of keys written per commit
//! - `ledger_jobs_total` - Jobs executed by the ledger actor (committed or not)

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Total commits
    pub commits_total: IntCounter,

    /// Writes per commit
    pub commit_writes: Histogram,

    /// Jobs executed by the actor
    pub jobs_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector on a private registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let commits_total =
            IntCounter::new("ledger_commits_total", "Total number of committed transactions")?;
        registry.register(Box::new(commits_total.clone()))?;

        let commit_writes = Histogram::with_opts(
            HistogramOpts::new("ledger_commit_writes", "Keys written per commit")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0]),
        )?;
        registry.register(Box::new(commit_writes.clone()))?;

        let jobs_total = IntCounter::new("ledger_jobs_total", "Jobs executed by the ledger actor")?;
        registry.register(Box::new(jobs_total.clone()))?;

        Ok(Self {
            commits_total,
            commit_writes,
            jobs_total,
            registry,
        })
    }

    /// Record a commit of `writes` keys
    pub fn record_commit(&self, writes: usize) {
        self.commits_total.inc();
        self.commit_writes.observe(writes as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_commit(3);
        metrics.jobs_total.inc();

        assert_eq!(metrics.commits_total.get(), 1);
        assert_eq!(metrics.commit_writes.get_sample_count(), 1);
        assert_eq!(metrics.registry.gather().len(), 3);
    }
}
