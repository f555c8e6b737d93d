//! The request log pipeline and its lifecycle hooks.
//!
//! A framework drives one [`RequestLog`] through the hooks in order:
//!
//! 1. [`RequestLog::route_request`] when the request is routed
//! 2. [`RequestLog::before_action_invocation`] just before the handler runs
//! 3. [`RequestLog::on_action_invocation_result`] when the handler produced a result
//! 4. [`RequestLog::on_action_invocation_finally`] after the handler, always
//!
//! A request that is suspended at step 4 writes nothing; its line is written
//! when the resumed invocation reaches step 4 again.

use crate::config::Config;
use crate::context::{RequestContext, RequestIdGenerator, RequestInfo};
use crate::format;
use crate::outcome::Outcome;
use crate::params::try_extract_params;
use crate::sink::{LogSink, TARGET, TracingSink};
use crate::worker::{self, LabelGuard};

use std::sync::Arc;
use tracing::debug;

/// Per-process request logger.
pub struct RequestLog {
    config: Config,
    ids: Arc<RequestIdGenerator>,
    sink: Arc<dyn LogSink>,
}

impl RequestLog {
    /// Logger writing through `tracing` with the process-wide id generator.
    pub fn new(config: Config) -> Self {
        Self::with_parts(config, RequestIdGenerator::shared(), Arc::new(TracingSink))
    }

    pub fn with_parts(
        config: Config,
        ids: Arc<RequestIdGenerator>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self { config, ids, sink }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the configuration, e.g. after the configuration source was
    /// re-read.
    pub fn on_configuration_read(&mut self, config: Config) {
        debug!(target: TARGET, "request log configuration reloaded");
        self.config = config;
    }

    /// Assigns a request id and start time.
    pub fn route_request(&self, info: RequestInfo) -> RequestContext {
        RequestContext::new(self.ids.next_id(), info)
    }

    /// Diagnostic label for the worker handling `ctx`.
    pub fn worker_label(&self, ctx: &RequestContext) -> String {
        worker::decorate(ctx)
    }

    /// Labels the current thread and enters the request span until the
    /// returned guard is dropped.
    pub fn before_action_invocation(&self, ctx: &RequestContext) -> LabelGuard {
        worker::enter(self.worker_label(ctx), worker::span(ctx))
    }

    pub fn on_action_invocation_result(&self, ctx: &mut RequestContext, outcome: Outcome) {
        ctx.set_outcome(outcome);
    }

    /// Writes the line for `ctx` unless it is suspended or already logged.
    ///
    /// Returns the line that was written.
    pub fn on_action_invocation_finally(&self, ctx: &mut RequestContext) -> Option<String> {
        if ctx.is_pending() {
            debug!(
                target: TARGET,
                request_id = ctx.request_id(),
                "request suspended, deferring log line"
            );
            return None;
        }

        if ctx.is_logged() {
            return None;
        }

        let line = self.format_line(ctx);
        self.sink.emit(&line);
        ctx.mark_logged();

        Some(line)
    }

    /// Renders the parameter block; failures are reported to the sink and
    /// produce an empty block.
    pub fn extract_params(&self, ctx: &RequestContext) -> String {
        try_extract_params(&ctx.params, &self.config.mask_rules).unwrap_or_else(|e| {
            self.sink.warn(ctx.request_id(), &e);
            String::new()
        })
    }

    pub fn format_line(&self, ctx: &RequestContext) -> String {
        format::format_line(
            ctx,
            &self.extract_params(ctx),
            &self.config.path_for_action,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParamError;
    use crate::params::Params;
    use crate::sink::{MemorySink, MockLogSink};

    fn info(action: &str, path: &str, params: Params) -> RequestInfo {
        RequestInfo {
            action: Some(action.to_string()),
            method: "POST".to_string(),
            path: path.to_string(),
            remote_address: "127.0.0.1".to_string(),
            session_id: Some("s1".to_string()),
            params,
        }
    }

    fn log_with(sink: Arc<dyn LogSink>) -> RequestLog {
        RequestLog::with_parts(
            Config::default(),
            Arc::new(RequestIdGenerator::with_prefix("0a0")),
            sink,
        )
    }

    #[test]
    fn test_route_request_assigns_sequential_ids() {
        let log = log_with(Arc::new(MemorySink::new()));

        let first = log.route_request(RequestInfo::default());
        let second = log.route_request(RequestInfo::default());

        assert_eq!(first.request_id(), "0a0-1");
        assert_eq!(second.request_id(), "0a0-2");
        assert!(first.start().is_some());
    }

    #[test]
    fn test_completed_request_logs_once() {
        let mut sink = MockLogSink::new();
        sink.expect_emit()
            .withf(|line: &str| {
                line.starts_with("Users.login 127.0.0.1 s1 POST login=bob\tpassword=* -> Redirect /")
                    && line.ends_with(" ms")
            })
            .times(1)
            .return_const(());
        let log = log_with(Arc::new(sink));

        let params: Params = [("login", "bob"), ("password", "hunter2")]
            .into_iter()
            .collect();
        let mut ctx = log.route_request(info("Users.login", "/login", params));
        log.on_action_invocation_result(&mut ctx, Outcome::redirect("/"));

        assert!(log.on_action_invocation_finally(&mut ctx).is_some());
        assert!(log.on_action_invocation_finally(&mut ctx).is_none());
    }

    #[test]
    fn test_suspended_request_writes_nothing() {
        let mut sink = MockLogSink::new();
        sink.expect_emit().times(0);
        let log = log_with(Arc::new(sink));

        let mut ctx = log.route_request(info("Reports.build", "/reports", Params::new()));
        ctx.suspend();

        assert!(log.on_action_invocation_finally(&mut ctx).is_none());
        assert!(!ctx.is_logged());
    }

    #[test]
    fn test_resumed_request_logs_real_outcome() {
        let sink = Arc::new(MemorySink::new());
        let log = log_with(sink.clone());

        let mut ctx = log.route_request(info("Reports.build", "/reports", Params::new()));
        ctx.suspend();
        assert!(log.on_action_invocation_finally(&mut ctx).is_none());

        ctx.resume();
        log.on_action_invocation_result(&mut ctx, Outcome::view("ReportView", 40));
        let line = log.on_action_invocation_finally(&mut ctx).unwrap();

        assert!(line.contains("-> RenderView ReportView 40 ms "));
        assert_eq!(sink.lines(), vec![line]);
    }

    #[test]
    fn test_missing_outcome_is_render_error() {
        let sink = Arc::new(MemorySink::new());
        let log = log_with(sink.clone());

        let mut ctx = log.route_request(info("Users.show", "/users/1", Params::new()));
        let line = log.on_action_invocation_finally(&mut ctx).unwrap();

        assert!(line.contains(" -> RenderError "));
    }

    #[test]
    fn test_extraction_failure_warns_and_keeps_line() {
        let mut sink = MockLogSink::new();
        sink.expect_warn()
            .withf(|request_id: &str, _error: &ParamError| request_id == "0a0-1")
            .times(1)
            .return_const(());
        sink.expect_emit()
            .withf(|line: &str| line.starts_with("Users.save 127.0.0.1 s1 POST  -> Ok"))
            .times(1)
            .return_const(());
        let log = log_with(Arc::new(sink));

        let mut params = Params::new();
        params.insert("tags", Vec::new());
        let mut ctx = log.route_request(info("Users.save", "/users", params));
        log.on_action_invocation_result(&mut ctx, Outcome::other("Ok"));

        assert!(log.on_action_invocation_finally(&mut ctx).is_some());
    }

    #[test]
    fn test_reloaded_configuration_applies() {
        let sink = Arc::new(MemorySink::new());
        let mut log = log_with(sink.clone());
        log.on_configuration_read(Config {
            path_for_action: "Users.".to_string(),
            ..Config::default()
        });

        let mut ctx = log.route_request(info("Users.show", "/users/1", Params::new()));
        let line = log.on_action_invocation_finally(&mut ctx).unwrap();

        assert!(line.starts_with("/users/1 "));
    }

    #[test]
    fn test_before_action_invocation_labels_thread() {
        let log = log_with(Arc::new(MemorySink::new()));
        let ctx = log.route_request(info("Users.show", "/users/1", Params::new()));

        let guard = log.before_action_invocation(&ctx);
        assert!(worker::current_name().contains("Users.show [0a0-1] (127.0.0.1 s1)"));
        drop(guard);

        assert!(!worker::current_name().contains("Users.show"));
    }
}
