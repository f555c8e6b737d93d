//! Request-scoped access to the correlation context from inside handlers.

use crate::context::RequestContext;
use crate::error::HandleRejection;
use crate::outcome::Outcome;
use crate::pipeline::RequestLog;
use crate::worker;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Span;

/// Shared handle to the context of one request.
///
/// The middleware stores a handle in the request extensions; handlers extract
/// it to attach custom data, name their action, or suspend the request. The
/// context lives behind the handle, so a clone moved into a background task
/// keeps it alive across a suspension.
///
/// # Example
///
/// ```rust,ignore
/// async fn build_report(log: RequestLogHandle) -> StatusCode {
///     log.suspend();
///     let span = log.span();
///     tokio::spawn(
///         async move {
///             let report = render_report().await;
///             log.complete(Some(Outcome::view("ReportView", report.millis)));
///         }
///         .instrument(span),
///     );
///     StatusCode::ACCEPTED
/// }
/// ```
#[derive(Clone)]
pub struct RequestLogHandle {
    log: Arc<RequestLog>,
    context: Arc<Mutex<RequestContext>>,
    span: Span,
}

impl RequestLogHandle {
    pub fn new(log: Arc<RequestLog>, context: RequestContext) -> Self {
        let span = worker::span(&context);
        Self {
            log,
            context: Arc::new(Mutex::new(context)),
            span,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RequestContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn request_id(&self) -> String {
        self.lock().request_id().to_string()
    }

    /// Copy of the current context.
    pub fn snapshot(&self) -> RequestContext {
        self.lock().clone()
    }

    /// Text appended after the session id in the log line.
    pub fn set_custom_data(&self, data: impl Into<String>) {
        self.lock().set_custom_data(data);
    }

    /// Names the action handling this request, e.g. `Users.show`.
    pub fn set_action(&self, action: impl Into<String>) {
        let action = action.into();
        self.span.record("action", tracing::field::display(&action));
        self.lock().action = Some(action);
    }

    pub fn set_outcome(&self, outcome: Outcome) {
        let mut ctx = self.lock();
        self.log.on_action_invocation_result(&mut ctx, outcome);
    }

    pub fn has_outcome(&self) -> bool {
        self.lock().outcome().is_some()
    }

    /// Defers the log line until [`RequestLogHandle::complete`].
    pub fn suspend(&self) {
        self.lock().suspend();
    }

    pub fn resume(&self) {
        self.lock().resume();
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_pending()
    }

    /// The `request` span; instrument continuations with it so their events
    /// stay correlated with this request.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// Runs the completion hook; returns the line if one was written.
    pub fn finish(&self) -> Option<String> {
        let mut ctx = self.lock();
        self.log.on_action_invocation_finally(&mut ctx)
    }

    /// Resumes a suspended request and writes its line. `None` logs a render
    /// error, replacing any outcome recorded before the suspension.
    pub fn complete(&self, outcome: Option<Outcome>) -> Option<String> {
        let mut ctx = self.lock();
        ctx.resume();
        match outcome {
            Some(outcome) => self.log.on_action_invocation_result(&mut ctx, outcome),
            None => ctx.clear_outcome(),
        }
        self.log.on_action_invocation_finally(&mut ctx)
    }
}

impl<S> FromRequestParts<S> for RequestLogHandle
where
    S: Send + Sync,
{
    type Rejection = HandleRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestLogHandle>()
            .cloned()
            .ok_or(HandleRejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::{RequestIdGenerator, RequestInfo};
    use crate::sink::MemorySink;
    use crate::worker::capture::Captured;
    use axum::http::Request;

    fn handle() -> (RequestLogHandle, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let log = Arc::new(RequestLog::with_parts(
            Config::default(),
            Arc::new(RequestIdGenerator::with_prefix("b0b")),
            sink.clone(),
        ));
        let ctx = log.route_request(RequestInfo {
            method: "GET".to_string(),
            path: "/reports/1".to_string(),
            remote_address: "10.1.1.1".to_string(),
            ..Default::default()
        });
        (RequestLogHandle::new(log, ctx), sink)
    }

    #[test]
    fn test_custom_data_and_action_reach_the_line() {
        let (handle, sink) = handle();

        handle.set_action("Reports.show");
        handle.set_custom_data("tenant=acme");
        handle.set_outcome(Outcome::other("RenderJson"));
        handle.finish();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Reports.show 10.1.1.1 no-session tenant=acme GET  -> RenderJson "));
    }

    #[test]
    fn test_suspended_handle_logs_on_complete() {
        let (handle, sink) = handle();

        handle.suspend();
        assert!(handle.finish().is_none());
        assert!(sink.lines().is_empty());

        let continuation = handle.clone();
        let line = std::thread::spawn(move || {
            continuation.complete(Some(Outcome::view("ReportView", 12)))
        })
        .join()
        .unwrap();

        assert!(line.unwrap().contains("-> RenderView ReportView 12 ms"));
        assert!(!handle.is_pending());
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn test_complete_without_outcome_is_render_error() {
        let (handle, sink) = handle();

        handle.suspend();
        handle.complete(None);

        assert!(sink.lines()[0].contains("-> RenderError"));
    }

    #[test]
    fn test_complete_without_outcome_discards_earlier_outcome() {
        let (handle, sink) = handle();

        handle.suspend();
        handle.set_outcome(Outcome::other("Accepted"));
        assert!(handle.finish().is_none());

        handle.complete(None);

        let line = &sink.lines()[0];
        assert!(line.contains("-> RenderError"), "{line}");
        assert!(!line.contains("Accepted"), "{line}");
    }

    #[test]
    fn test_set_action_is_recorded_on_span() {
        let captured = Captured::default();

        tracing::dispatcher::with_default(&captured.dispatch(), || {
            let (handle, _sink) = handle();
            let _entered = handle.span().entered();
            handle.set_action("Reports.show");
            tracing::info!("rendering");
        });

        let output = captured.output();
        assert!(output.contains("[b0b-1] (10.1.1.1 no-session)"), "{output}");
        assert!(output.contains("action=Reports.show"), "{output}");
    }

    #[test]
    fn test_request_id_is_stable() {
        let (handle, _sink) = handle();

        assert_eq!(handle.request_id(), "b0b-1");
        assert_eq!(handle.clone().request_id(), "b0b-1");
    }

    #[tokio::test]
    async fn test_extraction_requires_middleware() {
        let (parts, _) = Request::new(()).into_parts();
        let mut parts = parts;

        let result = RequestLogHandle::from_request_parts(&mut parts, &()).await;
        assert!(result.is_err());

        let (handle, _sink) = handle();
        parts.extensions.insert(handle);
        let result = RequestLogHandle::from_request_parts(&mut parts, &()).await;
        assert!(result.is_ok());
    }
}
