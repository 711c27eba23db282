//! # VM Metrics
//!
//! Prometheus handles for the transaction pipeline, registered into a
//! registry the host owns. Registration failures (duplicate names) are
//! returned, never panicked on.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

#[derive(Clone)]
pub struct VmMetrics {
    /// Lookups of a transaction ID in the deduplicator.
    pub tx_refreshes: IntCounter,
    /// Lookups that found a live canonical entry.
    pub tx_refresh_hits: IntCounter,
    /// Lookups that inserted a new entry.
    pub tx_refresh_misses: IntCounter,
    pub txs_parsed: IntCounter,
    pub txs_accepted: IntCounter,
    pub txs_rejected: IntCounter,
    /// Signals successfully handed to the engine.
    pub batch_flushes: IntCounter,
    /// Signals dropped because the engine channel was full.
    pub dropped_signals: IntCounter,
    pub dedup_size: IntGauge,
    pub verify_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let c = IntCounter::new(name, help)?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl VmMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let dedup_size = IntGauge::new("vm_dedup_size", "Live transactions held by the deduplicator")?;
        registry.register(Box::new(dedup_size.clone()))?;

        let verify_seconds = Histogram::with_opts(
            HistogramOpts::new("vm_verify_seconds", "Time spent verifying a transaction")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(verify_seconds.clone()))?;

        Ok(Self {
            tx_refreshes: counter(registry, "vm_tx_refreshes_total", "Deduplicator lookups")?,
            tx_refresh_hits: counter(
                registry,
                "vm_tx_refresh_hits_total",
                "Deduplicator lookups that found a live entry",
            )?,
            tx_refresh_misses: counter(
                registry,
                "vm_tx_refresh_misses_total",
                "Deduplicator lookups that inserted a new entry",
            )?,
            txs_parsed: counter(registry, "vm_txs_parsed_total", "Transactions parsed")?,
            txs_accepted: counter(registry, "vm_txs_accepted_total", "Transactions accepted")?,
            txs_rejected: counter(registry, "vm_txs_rejected_total", "Transactions rejected")?,
            batch_flushes: counter(
                registry,
                "vm_batch_flushes_total",
                "Pending-transaction signals delivered to the engine",
            )?,
            dropped_signals: counter(
                registry,
                "vm_dropped_signals_total",
                "Pending-transaction signals dropped on a full engine channel",
            )?,
            dedup_size,
            verify_seconds,
        })
    }
}
