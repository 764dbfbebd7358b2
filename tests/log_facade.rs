//! Exercises the `log` facade sink. Kept in its own test binary because it
//! installs the global logger.

use http_level_logger::{LogFacadeSink, LogSink, Request, RequestResponseLogger, Severity};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

struct RecordingLogger {
    records: Mutex<Vec<(Level, String, String)>>,
}

impl Log for RecordingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Info || metadata.target() == "verbose-api"
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.records.lock().unwrap().push((
                record.level(),
                record.target().to_string(),
                record.args().to_string(),
            ));
        }
    }

    fn flush(&self) {}
}

static LOGGER: RecordingLogger = RecordingLogger {
    records: Mutex::new(Vec::new()),
};

#[test]
fn log_facade_sink_uses_name_as_target() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let quiet = RequestResponseLogger::with_sink(LogFacadeSink::new("quiet-api"));
    let verbose = RequestResponseLogger::with_sink(LogFacadeSink::new("verbose-api"));

    assert!(quiet.sink().is_enabled(Severity::Info));
    assert!(!quiet.sink().is_enabled(Severity::Debug));
    assert!(verbose.sink().is_enabled(Severity::Trace));

    let request = Request::new(http::Method::GET, "http://api.example.com/health")
        .header("Accept", "text/plain");
    quiet.on_request("health()", &request);
    verbose.on_request("health()", &request);
    verbose.on_io_error("health()", io::Error::other("ex"), Duration::from_millis(1000));

    let records = LOGGER.records.lock().unwrap().clone();
    let quiet_records: Vec<_> = records.iter().filter(|(_, t, _)| t == "quiet-api").collect();
    let verbose_records: Vec<_> = records.iter().filter(|(_, t, _)| t == "verbose-api").collect();

    assert_eq!(quiet_records.len(), 2);
    assert!(quiet_records.iter().all(|(level, _, _)| *level == Level::Info));

    assert_eq!(
        verbose_records
            .iter()
            .map(|(level, _, msg)| (*level, msg.as_str()))
            .collect::<Vec<_>>(),
        vec![
            (Level::Info, "[health] ---> GET http://api.example.com/health HTTP/1.1"),
            (Level::Trace, "[health] Accept: text/plain"),
            (Level::Info, "[health] ---> END HTTP (0-byte body)"),
            (Level::Error, "[health] <--- ERROR Other: ex (1000ms)"),
            (Level::Debug, r#"[health] Custom { kind: Other, error: "ex" }"#),
            (Level::Debug, "[health] <--- END ERROR"),
        ]
    );
}
