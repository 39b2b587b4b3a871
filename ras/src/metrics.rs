//! Prometheus metrics for the RAS engine.
//!
//! [`RasMetrics`] owns a dedicated [`Registry`] so an embedding application
//! can encode it alongside its own metrics.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

pub struct RasMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Requests put on the wire, first transmissions and retransmissions alike.
    pub transmissions: IntCounterVec,
    /// Retransmissions after a timeout.
    pub retransmissions: IntCounter,
    /// Attempts that ended without an answer.
    pub timeouts: IntCounter,
    /// Rejects received, by message abbreviation.
    pub rejects: IntCounterVec,
    /// Rebinds to an alternate gatekeeper.
    pub failovers: IntCounter,
    /// Responses that failed security validation.
    pub auth_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub pending_transactions: IntGauge,
    /// 1 while registered, 0 otherwise.
    pub registered: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from first transmission to a correlated answer, in milliseconds.
    pub transaction_latency_ms: Histogram,
}

impl RasMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let transmissions = register_int_counter_vec_with_registry!(
            Opts::new("h323_ras_transmissions_total", "RAS requests transmitted"),
            &["kind"],
            registry
        )?;
        let retransmissions = register_int_counter_with_registry!(
            Opts::new(
                "h323_ras_retransmissions_total",
                "RAS requests retransmitted after a timeout"
            ),
            registry
        )?;
        let timeouts = register_int_counter_with_registry!(
            Opts::new("h323_ras_timeouts_total", "RAS attempts that timed out"),
            registry
        )?;
        let rejects = register_int_counter_vec_with_registry!(
            Opts::new("h323_ras_rejects_total", "RAS rejects received"),
            &["kind"],
            registry
        )?;
        let failovers = register_int_counter_with_registry!(
            Opts::new(
                "h323_ras_failovers_total",
                "Rebinds to an alternate gatekeeper"
            ),
            registry
        )?;
        let auth_failures = register_int_counter_with_registry!(
            Opts::new(
                "h323_ras_auth_failures_total",
                "Responses rejected by security validation"
            ),
            registry
        )?;

        let pending_transactions = register_int_gauge_with_registry!(
            Opts::new(
                "h323_ras_pending_transactions",
                "Transactions awaiting an answer"
            ),
            registry
        )?;
        let registered = register_int_gauge_with_registry!(
            Opts::new("h323_ras_registered", "1 while registered with a gatekeeper"),
            registry
        )?;

        // 1 ms → ~16 s
        let transaction_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "h323_ras_transaction_latency_ms",
                "Time to a correlated answer in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            transmissions,
            retransmissions,
            timeouts,
            rejects,
            failovers,
            auth_failures,
            pending_transactions,
            registered,
            transaction_latency_ms,
        })
    }
}

impl std::fmt::Debug for RasMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasMetrics").finish_non_exhaustive()
    }
}
