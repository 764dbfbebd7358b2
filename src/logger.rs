//! Level-driven request/response logger.
//!
//! [`RequestResponseLogger`] turns the lifecycle of one HTTP call into log
//! lines whose detail follows the verbosity of its sink:
//!
//! - INFO: request method and URL, response status and elapsed time, body sizes
//! - DEBUG: additionally the request and response bodies
//! - TRACE: additionally every header of both request and response
//!
//! Summary lines (INFO) and the failure line (ERROR) are always written; the
//! sink decides whether to keep them. DEBUG and TRACE lines are only formatted
//! once the sink has said it wants them.

use crate::error::Error;
use crate::sink::{LogSink, Severity, TracingSink};
use crate::types::{Headers, Request, Response, ResponseBody};
use std::any::type_name;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;
use tower::timeout::error::Elapsed;
use tower::BoxError;

const BINARY_DATA: &str = "Binary data";

/// Logs HTTP calls at four hook points: request sent, retry, response
/// received, and I/O failure.
///
/// # Examples
///
/// ```rust
/// use http_level_logger::{CapturingSink, Request, RequestResponseLogger, Severity};
///
/// let sink = CapturingSink::new(Severity::Trace);
/// let logger = RequestResponseLogger::with_sink(sink.clone());
///
/// let request = Request::new(http::Method::GET, "http://api.example.com")
///     .header("Content-Type", "application/json");
/// logger.on_request("someMethod()", &request);
///
/// assert_eq!(
///     sink.lines(),
///     vec![
///         (Severity::Info, "[someMethod] ---> GET http://api.example.com HTTP/1.1".to_string()),
///         (Severity::Trace, "[someMethod] Content-Type: application/json".to_string()),
///         (Severity::Info, "[someMethod] ---> END HTTP (0-byte body)".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RequestResponseLogger<S = TracingSink> {
    sink: S,
}

impl RequestResponseLogger<TracingSink> {
    /// Creates a logger writing `tracing` events tagged with `name`,
    /// typically the name of the client it is attached to.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_sink(TracingSink::new(name))
    }
}

impl<S: LogSink> RequestResponseLogger<S> {
    /// Creates a logger writing to `sink`.
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    /// Returns the sink lines are written to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Logs an outgoing request.
    pub fn on_request(&self, context: &str, request: &Request) {
        self.log(
            Severity::Info,
            context,
            format_args!("---> {} {} HTTP/1.1", request.method, request.url),
        );

        self.log_headers(context, &request.headers);

        if let Some(body) = &request.body {
            if self.sink.is_enabled(Severity::Debug) {
                let text = match request.charset {
                    Some(charset) => charset.decode_lossy(body),
                    None => Cow::Borrowed(BINARY_DATA),
                };
                self.log(Severity::Debug, context, format_args!(""));
                self.log(Severity::Debug, context, format_args!("{text}"));
            }
        }

        self.log(
            Severity::Info,
            context,
            format_args!("---> END HTTP ({}-byte body)", request.body_len()),
        );
    }

    /// Logs that the call is about to be attempted again.
    pub fn on_retry(&self, context: &str) {
        self.log(Severity::Info, context, format_args!("---> RETRYING"));
    }

    /// Logs a response and hands it back with its body re-attached.
    ///
    /// A streaming body is read to the end so it can be logged; the returned
    /// response then carries the buffered bytes. Responses to which no body
    /// applies (204, 205, or none present) come back untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyRead`] if reading a streaming body fails.
    pub fn on_response(
        &self,
        context: &str,
        mut response: Response,
        elapsed: Duration,
    ) -> Result<Response, Error> {
        let reason = response
            .reason
            .as_deref()
            .map(|reason| format!(" {reason}"))
            .unwrap_or_default();
        self.log(
            Severity::Info,
            context,
            format_args!(
                "<--- HTTP/1.1 {}{} ({}ms)",
                response.status,
                reason,
                elapsed.as_millis()
            ),
        );

        self.log_headers(context, &response.headers);

        match response.body.take() {
            Some(body) if !forbids_body(response.status) => {
                let debug = self.sink.is_enabled(Severity::Debug);
                if debug {
                    self.log(Severity::Debug, context, format_args!(""));
                }

                let bytes = body.into_bytes()?;
                if debug && !bytes.is_empty() {
                    let text = std::str::from_utf8(&bytes).unwrap_or(BINARY_DATA);
                    self.log(Severity::Debug, context, format_args!("{text}"));
                }

                self.log_end(context, bytes.len());
                response.body = Some(ResponseBody::Buffered(bytes));
            }
            body => {
                response.body = body;
                self.log_end(context, 0);
            }
        }

        Ok(response)
    }

    /// Logs a transport failure and returns the same error for the caller to
    /// propagate.
    ///
    /// The ERROR line is labelled with the kind of a [`std::io::Error`]
    /// (`io::Error::other("ex")` logs as `<--- ERROR Other: ex (..ms)`) and
    /// with the unqualified type name of any other error (`ReadTimeout`).
    pub fn on_io_error<E>(&self, context: &str, error: E, elapsed: Duration) -> E
    where
        E: StdError + 'static,
    {
        let label = match (&error as &dyn StdError).downcast_ref::<io::Error>() {
            Some(io_error) => format!("{:?}", io_error.kind()),
            None => short_type_name::<E>().to_owned(),
        };
        self.log_error(context, &label, &error, elapsed);
        error
    }

    /// Same as [`on_io_error`](Self::on_io_error) for type-erased errors, as
    /// returned by `Timeout`, `Buffer` and other tower middleware.
    ///
    /// The concrete type is no longer known, so the label comes from the
    /// error itself: the kind of a [`std::io::Error`], `Elapsed` for a tower
    /// timeout, otherwise the type name leading its `Debug` output, falling
    /// back to `Error`.
    pub fn on_boxed_error(&self, context: &str, error: BoxError, elapsed: Duration) -> BoxError {
        let label = dyn_label(&*error);
        self.log_error(context, &label, &*error, elapsed);
        error
    }

    fn log_error(&self, context: &str, label: &str, error: &dyn StdError, elapsed: Duration) {
        self.log(
            Severity::Error,
            context,
            format_args!("<--- ERROR {label}: {error} ({}ms)", elapsed.as_millis()),
        );

        if self.sink.is_enabled(Severity::Debug) {
            self.log(Severity::Debug, context, format_args!("{}", Report(error)));
            self.log(Severity::Debug, context, format_args!("<--- END ERROR"));
        }
    }

    fn log_headers(&self, context: &str, headers: &Headers) {
        if self.sink.is_enabled(Severity::Trace) {
            for (name, value) in headers.iter() {
                self.log(Severity::Trace, context, format_args!("{name}: {value}"));
            }
        }
    }

    fn log_end(&self, context: &str, body_len: usize) {
        self.log(
            Severity::Info,
            context,
            format_args!("<--- END HTTP ({body_len}-byte body)"),
        );
    }

    fn log(&self, severity: Severity, context: &str, message: fmt::Arguments<'_>) {
        let line = format!("[{}] {}", method_tag(context), message);
        self.sink.write(severity, &line);
    }
}

/// 204 No Content and 205 Reset Content never carry a body.
fn forbids_body(status: u16) -> bool {
    status == 204 || status == 205
}

/// The part of a call context before its argument list: `Api#get(String)`
/// is tagged `Api#get`.
fn method_tag(context: &str) -> &str {
    context.split_once('(').map_or(context, |(tag, _)| tag)
}

/// `my_crate::net::Timeout<String>` becomes `Timeout`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let name = type_name::<T>();
    let name = name.split_once('<').map_or(name, |(base, _)| base);
    name.rsplit("::").next().unwrap_or(name)
}

fn dyn_label(error: &(dyn StdError + 'static)) -> Cow<'static, str> {
    if let Some(io_error) = error.downcast_ref::<io::Error>() {
        return Cow::Owned(format!("{:?}", io_error.kind()));
    }
    if error.is::<Elapsed>() {
        return Cow::Borrowed("Elapsed");
    }
    let debug = format!("{error:?}");
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(debug.len());
    match debug[..end].chars().next() {
        Some(first) if first.is_uppercase() => Cow::Owned(debug[..end].to_owned()),
        _ => Cow::Borrowed("Error"),
    }
}

/// Debug rendering of an error followed by its chain of causes.
struct Report<'a>(&'a dyn StdError);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, "\nCaused by: {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}
