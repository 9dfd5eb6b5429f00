//! Timing wrapper bracketing every service operation.

use crate::domain::ports::{MetricSink, TimeUnit};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn convert(elapsed: Duration, unit: TimeUnit) -> f64 {
    match unit {
        TimeUnit::Seconds => elapsed.as_secs_f64(),
        TimeUnit::Milliseconds => elapsed.as_secs_f64() * 1000.0,
    }
}

/// Report `(name, value)` to every sink, converting to each sink's
/// preferred unit. A sink that fails is logged and skipped; delivery
/// never affects the measured operation.
pub fn report_all(sinks: &[Arc<dyn MetricSink>], name: &str, elapsed: Duration, tags: &[&str]) {
    for sink in sinks {
        let value = convert(elapsed, sink.unit());
        if let Err(err) = sink.send(name, value, tags) {
            tracing::error!(sink = sink.name(), %err, "error while sending metric");
        }
    }
}

/// Send a plain counter event to every sink, swallowing sink failures.
pub fn send_counter(sinks: &[Arc<dyn MetricSink>], name: &str, value: f64) {
    for sink in sinks {
        if let Err(err) = sink.send(name, value, &["counter"]) {
            tracing::error!(sink = sink.name(), %err, "error while sending counter");
        }
    }
}

/// Run `op`, reporting its wall-clock duration under `{name}.success` or
/// `{name}.error` depending on outcome. The result is returned unchanged
/// either way, regardless of sink failures.
pub fn with_timing<T, E, F>(name: &str, sinks: &[Arc<dyn MetricSink>], op: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let start = Instant::now();
    let result = op();
    let elapsed = start.elapsed();
    let outcome = if result.is_ok() { "success" } else { "error" };
    report_all(sinks, &format!("{}.{}", name, outcome), elapsed, &["timer"]);
    result
}
