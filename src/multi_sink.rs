//! Composite sink for writing one call's lines to several destinations.
//!
//! # Example
//!
//! ```rust
//! use http_level_logger::{CapturingSink, MultiSink, RequestResponseLogger, Severity, TracingSink};
//!
//! let audit = CapturingSink::new(Severity::Info);
//! let sink = MultiSink::new()
//!     .with(TracingSink::new("api-client"))
//!     .with(audit.clone());
//!
//! let logger = RequestResponseLogger::with_sink(sink);
//! logger.on_retry("getUser()");
//! assert_eq!(audit.lines_at(Severity::Info), vec!["[getUser] ---> RETRYING"]);
//! ```

use crate::sink::{LogSink, Severity};
use std::fmt;
use std::sync::Arc;

/// A sink that delegates to multiple inner sinks.
///
/// A severity is enabled when any inner sink enables it. Each write goes to
/// every inner sink that enables its severity, so a quiet sink never sees
/// the detail lines a verbose sibling asked for.
#[derive(Clone, Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink. Returns self for builder pattern.
    pub fn with<S: LogSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl fmt::Debug for MultiSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl LogSink for MultiSink {
    fn is_enabled(&self, severity: Severity) -> bool {
        self.sinks.iter().any(|sink| sink.is_enabled(severity))
    }

    fn write(&self, severity: Severity, line: &str) {
        for sink in self.sinks.iter().filter(|sink| sink.is_enabled(severity)) {
            sink.write(severity, line);
        }
    }
}
