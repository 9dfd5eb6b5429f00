pub mod log;
pub mod statsd;

pub use log::LogSink;
pub use statsd::StatsdSink;
