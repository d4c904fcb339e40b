//! Telemetry utilities for handler timing and span construction.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Handlers running longer than this are reported at `warn`.
const SLOW_HANDLER: Duration = Duration::from_millis(500);

/// Guard for timing one composition handler.
///
/// Logs the handler latency when dropped.
pub struct HandlerTimer {
    composition: String,
    start: Instant,
}

impl HandlerTimer {
    /// Start timing a handler.
    pub fn new(composition: impl Into<String>) -> Self {
        Self {
            composition: composition.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for HandlerTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        if elapsed >= SLOW_HANDLER {
            warn!(composition = %self.composition, elapsed_ms, "Slow handler");
        } else {
            debug!(composition = %self.composition, elapsed_ms, "Handler finished");
        }
    }
}

/// Standardized span constructors for client observability.
pub mod spans {
    use tracing::{Level, Span, info_span, span};

    /// Create a span for a session's listen loop.
    pub fn session(client_id: &str, address: &str, port: u16) -> Span {
        info_span!("session", client = %client_id, address = %address, port = port)
    }

    /// Create a span for dispatching one message.
    pub fn dispatch(command: &str, source: &str, origin: Option<&str>) -> Span {
        if let Some(origin) = origin {
            span!(Level::DEBUG, "dispatch", command = %command, source = %source, origin = %origin)
        } else {
            span!(Level::DEBUG, "dispatch", command = %command, source = %source)
        }
    }

    /// Create a span for a plugin lifecycle hook.
    pub fn plugin(name: &str, phase: &str) -> Span {
        info_span!("plugin", name = %name, phase = %phase)
    }
}
