#![allow(dead_code)]

use axum_test::TestServer;
use request_log::config::Config;
use request_log::context::RequestIdGenerator;
use request_log::routes::demo_routes;
use request_log::sink::MemorySink;
use request_log::RequestLog;
use std::sync::Arc;
use std::time::Duration;

pub const PREFIX: &str = "t01";

pub fn create_test_log() -> (Arc<RequestLog>, Arc<MemorySink>) {
    create_test_log_with(Config::default())
}

pub fn create_test_log_with(config: Config) -> (Arc<RequestLog>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let log = Arc::new(RequestLog::with_parts(
        config,
        Arc::new(RequestIdGenerator::with_prefix(PREFIX)),
        sink.clone(),
    ));
    (log, sink)
}

/// Demo router behind a test server, plus the sink it writes to.
pub fn make_server() -> (TestServer, Arc<MemorySink>) {
    let (log, sink) = create_test_log();
    let server = TestServer::new(demo_routes(log)).unwrap();
    (server, sink)
}

/// The single line written so far.
pub fn only_line(sink: &MemorySink) -> String {
    let lines = sink.lines();
    assert_eq!(lines.len(), 1, "expected exactly one line, got {lines:?}");
    lines.into_iter().next().unwrap()
}

/// Polls the sink until it holds `count` lines or two seconds pass.
pub async fn wait_for_lines(sink: &MemorySink, count: usize) -> Vec<String> {
    for _ in 0..200 {
        let lines = sink.lines();
        if lines.len() >= count {
            return lines;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sink.lines()
}
