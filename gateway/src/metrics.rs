//! Metrics collection for observability
//!
//! Prometheus metrics for the rail gateway, kept in the gateway's own
//! registry so several domains can run in one process.
//!
//! # Metrics
//!
//! - `rail_submissions_total` - Messages accepted from local submitters
//! - `rail_submission_failures_total{kind}` - Rejected commands by failure class
//! - `rail_settlements_total` - Messages settled (local and inbound)
//! - `rail_routed_total` - Messages handed to the delivery service
//! - `rail_inbound_total` - Inbound deliveries accepted
//! - `rail_command_duration_seconds` - Histogram of command latencies

use crate::types::SubmissionReceipt;
use crate::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use protocol_core::{Error, MessageStatus};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accepted local submissions
    pub submissions_total: IntCounter,

    /// Rejections by failure class
    pub failures_total: IntCounterVec,

    /// Settled messages
    pub settlements_total: IntCounter,

    /// Routed messages
    pub routed_total: IntCounter,

    /// Accepted inbound deliveries
    pub inbound_total: IntCounter,

    /// Command duration histogram
    pub command_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let submissions_total = IntCounter::new(
            "rail_submissions_total",
            "Messages accepted from local submitters",
        )?;
        registry.register(Box::new(submissions_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new(
                "rail_submission_failures_total",
                "Rejected commands by failure class",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let settlements_total =
            IntCounter::new("rail_settlements_total", "Messages settled")?;
        registry.register(Box::new(settlements_total.clone()))?;

        let routed_total = IntCounter::new(
            "rail_routed_total",
            "Messages handed to the delivery service",
        )?;
        registry.register(Box::new(routed_total.clone()))?;

        let inbound_total =
            IntCounter::new("rail_inbound_total", "Inbound deliveries accepted")?;
        registry.register(Box::new(inbound_total.clone()))?;

        let command_duration = Histogram::with_opts(
            HistogramOpts::new(
                "rail_command_duration_seconds",
                "Histogram of command latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        Ok(Self {
            submissions_total,
            failures_total,
            settlements_total,
            routed_total,
            inbound_total,
            command_duration,
            registry,
        })
    }

    /// Record the outcome of a local submission
    pub fn record_submission(&self, outcome: &std::result::Result<SubmissionReceipt, Error>) {
        match outcome {
            Ok(receipt) => {
                self.submissions_total.inc();
                self.record_receipt(receipt);
            }
            Err(e) => self.record_failure(e),
        }
    }

    /// Record the outcome of an inbound delivery
    pub fn record_inbound(&self, outcome: &std::result::Result<SubmissionReceipt, Error>) {
        match outcome {
            Ok(receipt) => {
                self.inbound_total.inc();
                self.record_receipt(receipt);
            }
            Err(e) => self.record_failure(e),
        }
    }

    /// Count a rejected command
    pub fn record_failure(&self, error: &Error) {
        self.failures_total
            .with_label_values(&[error.kind().as_str()])
            .inc();
    }

    fn record_receipt(&self, receipt: &SubmissionReceipt) {
        if receipt.settlement_id.is_some() {
            self.settlements_total.inc();
        }
        if receipt.status == MessageStatus::Routed {
            self.routed_total.inc();
        }
    }

    /// Render the registry in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("submissions_total", &self.submissions_total.get())
            .field("routed_total", &self.routed_total.get())
            .field("inbound_total", &self.inbound_total.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol_core::MessageId;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.submissions_total.get(), 0);
    }

    #[test]
    fn test_failures_labelled_by_kind() {
        let metrics = Metrics::new().unwrap();
        let id = MessageId::from_bytes([1; 32]);
        metrics.record_submission(&Err(Error::DuplicateMessage(id)));
        metrics.record_submission(&Err(Error::DuplicateMessage(id)));
        metrics.record_submission(&Err(Error::InvalidAmount("0".into())));

        assert_eq!(
            metrics
                .failures_total
                .with_label_values(&["duplication"])
                .get(),
            2
        );
        assert_eq!(
            metrics.failures_total.with_label_values(&["format"]).get(),
            1
        );
        assert_eq!(metrics.submissions_total.get(), 0);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("rail_submission_failures_total{kind=\"duplication\"} 2"));
    }
}
