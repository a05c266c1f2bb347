//! Workflow metrics
//!
//! # Metrics
//!
//! - `trade_invocations_total{function, outcome}` - Successful invocations
//! - `trade_rejections_total{function, kind}` - Rejected invocations by error class

use crate::workflow::Outcome;
use crate::{Error, ErrorKind, Result};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Workflow metrics collector
#[derive(Clone, Debug)]
pub struct WorkflowMetrics {
    /// Successful invocations
    pub invocations_total: IntCounterVec,

    /// Rejected invocations
    pub rejections_total: IntCounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl WorkflowMetrics {
    /// Create collector on a private registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let invocations_total = IntCounterVec::new(
            Opts::new("trade_invocations_total", "Successful workflow invocations"),
            &["function", "outcome"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("trade_rejections_total", "Rejected workflow invocations"),
            &["function", "kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        Ok(Self {
            invocations_total,
            rejections_total,
            registry,
        })
    }

    /// Record a successful invocation
    pub fn record_success(&self, function: &str, outcome: Outcome) {
        self.invocations_total
            .with_label_values(&[function, outcome.as_str()])
            .inc();
    }

    /// Record a rejected invocation
    pub fn record_rejection(&self, function: &str, kind: ErrorKind) {
        self.rejections_total
            .with_label_values(&[function, kind.as_str()])
            .inc();
    }

    /// Text exposition of every metric on the registry
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::InvalidState(format!("Metrics output is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_encode() {
        let metrics = WorkflowMetrics::new().unwrap();
        metrics.record_success("acceptTrade", Outcome::AlreadyDone);
        metrics.record_rejection("acceptLC", ErrorKind::PreconditionFailed);

        assert_eq!(
            metrics
                .invocations_total
                .with_label_values(&["acceptTrade", "already_done"])
                .get(),
            1
        );

        let text = metrics.encode().unwrap();
        assert!(text.contains("trade_rejections_total"));
        assert!(text.contains("kind=\"precondition_failed\""));
    }
}
