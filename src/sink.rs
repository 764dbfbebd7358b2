//! Logging sinks the request/response logger writes to.
//!
//! A sink answers "is this severity enabled?" and accepts finished lines.
//! [`TracingSink`] targets the `tracing` ecosystem, [`LogFacadeSink`] the
//! `log` facade, and [`CapturingSink`] keeps lines in memory for tests.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a logged line, ordered from least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        })
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => tracing::Level::ERROR,
            Severity::Warn => tracing::Level::WARN,
            Severity::Info => tracing::Level::INFO,
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Trace => tracing::Level::TRACE,
        }
    }
}

impl From<Severity> for log::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => log::Level::Error,
            Severity::Warn => log::Level::Warn,
            Severity::Info => log::Level::Info,
            Severity::Debug => log::Level::Debug,
            Severity::Trace => log::Level::Trace,
        }
    }
}

/// Destination for formatted log lines.
///
/// Implementations are shared by every call going through one HTTP client,
/// so they must tolerate concurrent use.
pub trait LogSink: Send + Sync {
    /// Whether a line at `severity` would be kept.
    fn is_enabled(&self, severity: Severity) -> bool;

    /// Writes one finished line.
    fn write(&self, severity: Severity, line: &str);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn is_enabled(&self, severity: Severity) -> bool {
        (**self).is_enabled(severity)
    }

    fn write(&self, severity: Severity, line: &str) {
        (**self).write(severity, line)
    }
}

impl<S: LogSink + ?Sized> LogSink for &S {
    fn is_enabled(&self, severity: Severity) -> bool {
        (**self).is_enabled(severity)
    }

    fn write(&self, severity: Severity, line: &str) {
        (**self).write(severity, line)
    }
}

/// Sink emitting `tracing` events.
///
/// Checks and events run inside an `http_client` span whose `logger` field
/// holds the name the sink was bound to. Plain target directives such as
/// `RUST_LOG=http_level_logger=debug` set the verbosity of every client;
/// span directives select it per client:
///
/// ```text
/// RUST_LOG='info,[http_client{logger=user-api}]=trace'
/// ```
#[derive(Debug, Clone)]
pub struct TracingSink {
    name: Cow<'static, str>,
}

impl TracingSink {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ERROR level so the span exists whenever any directive could match it.
    fn scope(&self) -> tracing::Span {
        tracing::error_span!("http_client", logger = %self.name)
    }
}

impl LogSink for TracingSink {
    fn is_enabled(&self, severity: Severity) -> bool {
        self.scope().in_scope(|| match severity {
            Severity::Error => tracing::enabled!(tracing::Level::ERROR),
            Severity::Warn => tracing::enabled!(tracing::Level::WARN),
            Severity::Info => tracing::enabled!(tracing::Level::INFO),
            Severity::Debug => tracing::enabled!(tracing::Level::DEBUG),
            Severity::Trace => tracing::enabled!(tracing::Level::TRACE),
        })
    }

    fn write(&self, severity: Severity, line: &str) {
        self.scope().in_scope(|| match severity {
            Severity::Error => tracing::error!("{line}"),
            Severity::Warn => tracing::warn!("{line}"),
            Severity::Info => tracing::info!("{line}"),
            Severity::Debug => tracing::debug!("{line}"),
            Severity::Trace => tracing::trace!("{line}"),
        })
    }
}

/// Sink writing records through the `log` facade, using the bound name as
/// the record target.
#[derive(Debug, Clone)]
pub struct LogFacadeSink {
    target: Cow<'static, str>,
}

impl LogFacadeSink {
    pub fn new(target: impl Into<Cow<'static, str>>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl LogSink for LogFacadeSink {
    fn is_enabled(&self, severity: Severity) -> bool {
        log::log_enabled!(target: self.target(), log::Level::from(severity))
    }

    fn write(&self, severity: Severity, line: &str) {
        log::log!(target: self.target(), log::Level::from(severity), "{line}");
    }
}

/// In-memory sink recording every line written to it, in order.
///
/// `is_enabled` answers from the configured threshold; `write` records
/// unconditionally, so tests can see exactly what the logger chose to emit.
/// Clones share the same buffer.
///
/// # Examples
///
/// ```rust
/// use http_level_logger::{CapturingSink, RequestResponseLogger, Severity};
///
/// let sink = CapturingSink::new(Severity::Info);
/// let logger = RequestResponseLogger::with_sink(sink.clone());
/// logger.on_retry("getUser()");
///
/// assert_eq!(sink.lines(), vec![(Severity::Info, "[getUser] ---> RETRYING".to_string())]);
/// ```
#[derive(Debug, Clone)]
pub struct CapturingSink {
    threshold: Severity,
    lines: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl CapturingSink {
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold,
            lines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    /// All recorded lines, oldest first.
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded lines at exactly `severity`.
    pub fn lines_at(&self, severity: Severity) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, line)| line)
            .collect()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for CapturingSink {
    fn is_enabled(&self, severity: Severity) -> bool {
        severity <= self.threshold
    }

    fn write(&self, severity: Severity, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, line.to_owned()));
    }
}
