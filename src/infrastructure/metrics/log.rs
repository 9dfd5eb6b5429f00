//! Metric sink that emits events through the process log.
//!
//! Stands in for an external event transport when none is configured;
//! also handy for eyeballing timings in development.

use crate::domain::ports::{MetricSink, SinkError, TimeUnit};

#[derive(Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl MetricSink for LogSink {
    fn unit(&self) -> TimeUnit {
        TimeUnit::Seconds
    }

    fn send(&self, name: &str, value: f64, tags: &[&str]) -> Result<(), SinkError> {
        tracing::info!(metric = name, value, ?tags, "metric event");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
