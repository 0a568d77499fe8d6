//! Execution traces and the observers they are reported to

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::Metrics;

/// One traced action
#[derive(Debug, Clone)]
pub struct Trace {
    pub action: &'static str,
    pub start: Instant,
    pub fields: BTreeMap<&'static str, Value>,
    pub error: Option<String>,
}

impl Trace {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            start: Instant::now(),
            fields: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_field(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.set_field(key, value);
        self
    }

    pub fn set_field(&mut self, key: &'static str, value: impl Into<Value>) {
        self.fields.insert(key, value.into());
    }

    pub fn fail(&mut self, err: &dyn Display) {
        self.error = Some(err.to_string());
    }

    pub fn duration(&self) -> Duration {
        self.start.elapsed()
    }

    fn fields_string(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait ExecutionObserver: Send + Sync {
    fn observe(&self, trace: &Trace);
}

/// Logs failed actions at error level and the rest at debug
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ExecutionObserver for LogObserver {
    fn observe(&self, trace: &Trace) {
        let duration_ms = trace.duration().as_millis() as u64;
        match &trace.error {
            Some(error) => tracing::error!(
                action = trace.action,
                duration_ms,
                fields = %trace.fields_string(),
                error = %error,
                "Action failed"
            ),
            None => tracing::debug!(
                action = trace.action,
                duration_ms,
                fields = %trace.fields_string(),
                "Action completed"
            ),
        }
    }
}

/// Feeds the error and import counters
pub struct MetricsObserver {
    metrics: Arc<Metrics>,
}

impl MetricsObserver {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl ExecutionObserver for MetricsObserver {
    fn observe(&self, trace: &Trace) {
        if trace.error.is_some() {
            self.metrics.record_error();
        }

        let count = |key: &str| trace.fields.get(key).and_then(Value::as_u64).unwrap_or(0);
        let (batches, rows) = (count("batches"), count("rows"));
        if batches > 0 || rows > 0 {
            self.metrics.record_import(batches, rows);
        }
    }
}
