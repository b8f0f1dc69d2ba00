//! Prometheus metrics for a repasse automation run.
//!
//! Each run owns its registry; the text exposition is written next to the
//! run evidence when the run finishes.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::path::Path;

/// Metrics collector for one automation run.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    repasses_imported: IntCounter,
    repasse_outcomes: IntCounterVec,
    db_errors: IntCounter,
    browser_errors: IntCounter,
    repasse_duration: Histogram,
}

impl Metrics {
    /// Create a new metrics instance with its own registry.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let repasses_imported = IntCounter::new(
            "repasse_imported_total",
            "Total number of repasses imported into HOS_REPASSE_MEDICO",
        )?;

        let repasse_outcomes = IntCounterVec::new(
            Opts::new(
                "repasse_processed_total",
                "Total number of pending repasses processed, by outcome",
            ),
            &["outcome"],
        )?;

        let db_errors = IntCounter::new(
            "repasse_db_errors_total",
            "Total number of database errors",
        )?;

        let browser_errors = IntCounter::new(
            "repasse_browser_errors_total",
            "Total number of browser automation errors",
        )?;

        let repasse_duration = Histogram::with_opts(
            HistogramOpts::new(
                "repasse_processing_seconds",
                "Time spent processing one pending repasse",
            )
            .buckets(vec![1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0]),
        )?;

        registry.register(Box::new(repasses_imported.clone()))?;
        registry.register(Box::new(repasse_outcomes.clone()))?;
        registry.register(Box::new(db_errors.clone()))?;
        registry.register(Box::new(browser_errors.clone()))?;
        registry.register(Box::new(repasse_duration.clone()))?;

        Ok(Self {
            registry,
            repasses_imported,
            repasse_outcomes,
            db_errors,
            browser_errors,
            repasse_duration,
        })
    }

    /// Increment the imported repasses counter.
    pub fn inc_imported(&self) {
        self.repasses_imported.inc();
    }

    /// Count one processed repasse under the given outcome label.
    pub fn inc_outcome(&self, outcome: &str) {
        self.repasse_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn inc_db_errors(&self) {
        self.db_errors.inc();
    }

    pub fn inc_browser_errors(&self) {
        self.browser_errors.inc();
    }

    /// Record how long one repasse took.
    pub fn observe_repasse_duration(&self, duration_secs: f64) {
        self.repasse_duration.observe(duration_secs);
    }

    /// Get the metrics in Prometheus text format.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Write the text exposition to a file (node exporter textfile format).
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.gather()?)?;
        Ok(())
    }
}
