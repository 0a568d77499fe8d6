//! Service counters exposed on `/metrics`

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Metrics {
    /// Failed executions and traced actions
    pub errors_total: AtomicU64,

    // === Runs ===
    pub runs_started: AtomicU64,
    pub runs_finished: AtomicU64,
    /// Runs that found no eligible file
    pub runs_skipped: AtomicU64,
    pub runs_failed: AtomicU64,
    /// Triggers rejected while a run was in flight
    pub busy_rejections: AtomicU64,
    pub run_duration_ms_total: AtomicU64,

    // === Import ===
    pub bulk_inserts_total: AtomicU64,
    pub rows_inserted_total: AtomicU64,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_finished(&self, duration: Duration) {
        self.runs_finished.fetch_add(1, Ordering::Relaxed);
        self.add_duration(duration);
    }

    pub fn record_run_skipped(&self, duration: Duration) {
        self.runs_skipped.fetch_add(1, Ordering::Relaxed);
        self.add_duration(duration);
    }

    pub fn record_run_failed(&self, duration: Duration) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        self.add_duration(duration);
    }

    pub fn record_busy_rejection(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_import(&self, batches: u64, rows: u64) {
        self.bulk_inserts_total.fetch_add(batches, Ordering::Relaxed);
        self.rows_inserted_total.fetch_add(rows, Ordering::Relaxed);
    }

    fn add_duration(&self, duration: Duration) {
        self.run_duration_ms_total
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            errors_total: self.errors_total.load(Ordering::Relaxed),
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_finished: self.runs_finished.load(Ordering::Relaxed),
            runs_skipped: self.runs_skipped.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            run_duration_ms_total: self.run_duration_ms_total.load(Ordering::Relaxed),
            bulk_inserts_total: self.bulk_inserts_total.load(Ordering::Relaxed),
            rows_inserted_total: self.rows_inserted_total.load(Ordering::Relaxed),
        }
    }

    /// Render in the Prometheus text exposition format
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        let mut counter = |name: &str, help: &str, value: u64| {
            output.push_str(&format!("# HELP usage_importer_{} {}\n", name, help));
            output.push_str(&format!("# TYPE usage_importer_{} counter\n", name));
            output.push_str(&format!("usage_importer_{} {}\n", name, value));
        };

        counter("errors_total", "Failed importer executions", snapshot.errors_total);
        counter("runs_started_total", "Import runs started", snapshot.runs_started);
        counter("runs_finished_total", "Import runs finished", snapshot.runs_finished);
        counter(
            "runs_skipped_total",
            "Import runs without an eligible file",
            snapshot.runs_skipped,
        );
        counter("runs_failed_total", "Import runs failed", snapshot.runs_failed);
        counter(
            "busy_rejections_total",
            "Triggers rejected while busy",
            snapshot.busy_rejections,
        );
        counter(
            "run_duration_ms_total",
            "Total time spent in import runs",
            snapshot.run_duration_ms_total,
        );
        counter(
            "bulk_inserts_total",
            "Bulk insert statements executed",
            snapshot.bulk_inserts_total,
        );
        counter(
            "rows_inserted_total",
            "Usage rows inserted",
            snapshot.rows_inserted_total,
        );

        output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub errors_total: u64,
    pub runs_started: u64,
    pub runs_finished: u64,
    pub runs_skipped: u64,
    pub runs_failed: u64,
    pub busy_rejections: u64,
    pub run_duration_ms_total: u64,
    pub bulk_inserts_total: u64,
    pub rows_inserted_total: u64,
}
