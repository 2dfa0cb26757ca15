//! Observer hook for raw protocol traffic
//!
//! The transport and the codec report every datagram, line and command they
//! handle to a [`TraceHook`]. The default hook does nothing.

use std::fmt;
use std::sync::Arc;

use tracing::Level;

/// Direction of a traced byte sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("<-"),
            Direction::Outbound => f.write_str("->"),
        }
    }
}

/// Receives raw bytes as they cross the client boundary
pub trait TraceHook: Send + Sync {
    fn on_bytes(&self, direction: Direction, label: &str, data: &[u8]);
}

/// Shared handle used by the transport and codec
pub type SharedTrace = Arc<dyn TraceHook>;

/// Hook that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl TraceHook for NoopTrace {
    fn on_bytes(&self, _direction: Direction, _label: &str, _data: &[u8]) {}
}

/// Dumps traffic through `tracing` at TRACE level, ten bytes per row
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHexDump;

impl TraceHook for TracingHexDump {
    fn on_bytes(&self, direction: Direction, label: &str, data: &[u8]) {
        if !tracing::enabled!(Level::TRACE) {
            return;
        }
        tracing::trace!("{} {} ({} bytes)", direction, label, data.len());
        for line in hex_dump(data) {
            tracing::trace!("{}", line);
        }
    }
}

/// Returns the default no-op hook
pub fn noop() -> SharedTrace {
    Arc::new(NoopTrace)
}

/// Formats bytes as offset/hex rows followed by printable-character rows
pub fn hex_dump(data: &[u8]) -> Vec<String> {
    let mut lines = Vec::with_capacity(data.len() / 5 + 1);
    for (row, chunk) in data.chunks(10).enumerate() {
        let hex = chunk
            .iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(" ");
        let text = chunk
            .iter()
            .map(|&b| if (33..128).contains(&b) { b as char } else { ' ' })
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(format!("{:<3} {}", row * 10, hex));
        lines.push(format!("    {}", text));
    }
    lines
}
