//! # Prometheus Metrics
//!
//! Operational metrics for the harness. The node owns one
//! [`prometheus::Registry`]; the VM registers its own handles into the same
//! registry at initialization, so a single [`NodeMetrics::encode`] dumps
//! everything.
//!
//! All names carry the `utxo_vm_node` prefix so they do not collide with
//! any default global registry consumers.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

/// Holds the engine-side metric handles and the shared registry.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// `PendingTxs` signals the engine answered.
    pub batches_pulled: IntCounter,
    /// Transactions the engine accepted.
    pub txs_accepted: IntCounter,
    /// Transactions the engine rejected.
    pub txs_rejected: IntCounter,
    /// Lines read from stdin that the VM refused to issue.
    pub submissions_refused: IntCounter,
    /// Time spent deciding one batch.
    pub batch_decision_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let c = IntCounter::new(name, help)?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl NodeMetrics {
    /// Creates the registry and registers the engine metrics. Call once at
    /// startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("utxo_vm_node".into()), None)?;

        let batch_decision_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "batch_decision_seconds",
                "Time spent deciding one batch of pending transactions",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(batch_decision_seconds.clone()))?;

        Ok(Self {
            batches_pulled: counter(
                &registry,
                "batches_pulled_total",
                "Pending-transaction signals answered by the engine",
            )?,
            txs_accepted: counter(&registry, "txs_accepted_total", "Transactions accepted")?,
            txs_rejected: counter(&registry, "txs_rejected_total", "Transactions rejected")?,
            submissions_refused: counter(
                &registry,
                "submissions_refused_total",
                "Submitted transactions the VM refused",
            )?,
            batch_decision_seconds,
            registry,
        })
    }

    /// The registry the VM should register into.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
