//! statsd metric sink over UDP.

use crate::domain::ports::{MetricSink, SinkError, TimeUnit};
use std::net::UdpSocket;

/// Prefix prepended to every metric name.
const PREFIX: &str = "insult";

pub struct StatsdSink {
    socket: UdpSocket,
    addr: String,
}

impl StatsdSink {
    pub fn new(addr: impl Into<String>) -> Result<Self, SinkError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|err| SinkError(err.to_string()))?;
        Ok(Self {
            socket,
            addr: addr.into(),
        })
    }

    fn render(name: &str, value: f64, tags: &[&str]) -> String {
        // Dots separate statsd buckets; flatten them out of the name.
        let name = name.replace([' ', '/'], ".");
        if tags.contains(&"counter") {
            format!("{}.{}:{}|c", PREFIX, name, value)
        } else {
            format!("{}.{}:{}|ms", PREFIX, name, value)
        }
    }
}

impl MetricSink for StatsdSink {
    fn unit(&self) -> TimeUnit {
        TimeUnit::Milliseconds
    }

    fn send(&self, name: &str, value: f64, tags: &[&str]) -> Result<(), SinkError> {
        let datagram = Self::render(name, value, tags);
        self.socket
            .send_to(datagram.as_bytes(), self.addr.as_str())
            .map_err(|err| SinkError(err.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "statsd"
    }
}
