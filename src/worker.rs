//! Diagnostic labels for the worker running a request.
//!
//! Async work carries the label as a `request` span: every event emitted
//! inside the handler (or inside a continuation instrumented with
//! [`crate::RequestLogHandle::span`]) shows the request's correlation fields:
//!
//! ```text
//! INFO request{path=/users/7 label=[a1f-7] (10.0.0.1 no-session) action=Users.show}: app: loading user
//! ```
//!
//! The `action` field starts as the upstream action or matched route and is
//! recorded again when the handler names its action.
//!
//! Synchronous callers use [`enter`], which sets a thread label such as
//! `pool-1 Users.show [a1f-7] (10.0.0.1 no-session)` and enters the span until
//! the returned guard is dropped, including during unwinding. The part before
//! the first space is the worker's own name; decorating an already-decorated
//! name keeps only that part, so labels never stack.

use crate::context::RequestContext;
use crate::sink::TARGET;

use std::cell::RefCell;
use tracing::span::EnteredSpan;
use tracing::{Span, field};

const FALLBACK_NAME: &str = "worker";

thread_local! {
    static THREAD_LABEL: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Current label of the running thread.
pub fn current_name() -> String {
    if let Some(label) = THREAD_LABEL.with(|label| label.borrow().clone()) {
        return label;
    }

    std::thread::current()
        .name()
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// Strips any request decoration from a worker name.
pub fn original_name(name: &str) -> &str {
    name.split_once(' ').map_or(name, |(head, _)| head)
}

/// `[<request id>] (<remote address> <session>)`
pub fn correlation(ctx: &RequestContext) -> String {
    format!(
        "[{}] ({} {})",
        ctx.request_id(),
        ctx.remote_address,
        ctx.session_label()
    )
}

/// Builds the label for `ctx` on top of the current worker's original name.
pub fn decorate(ctx: &RequestContext) -> String {
    format!(
        "{} {} {}",
        original_name(&current_name()),
        ctx.action.as_deref().unwrap_or(&ctx.path),
        correlation(ctx),
    )
}

/// Span carrying the correlation fields of `ctx`.
pub fn span(ctx: &RequestContext) -> Span {
    let span = tracing::info_span!(
        target: TARGET,
        "request",
        path = %ctx.path,
        label = %correlation(ctx),
        action = field::Empty,
    );
    if let Some(action) = ctx.action.as_deref() {
        span.record("action", field::display(action));
    }
    span
}

/// Restores the thread label and leaves the request span on drop.
#[must_use = "the label is restored as soon as the guard is dropped"]
pub struct LabelGuard {
    _span: EnteredSpan,
}

/// Labels the current thread and enters `span` until the guard is dropped.
pub fn enter(label: String, span: Span) -> LabelGuard {
    THREAD_LABEL.with(|current| *current.borrow_mut() = Some(label));
    LabelGuard {
        _span: span.entered(),
    }
}

impl Drop for LabelGuard {
    fn drop(&mut self) {
        THREAD_LABEL.with(|current| {
            let mut current = current.borrow_mut();
            let restored = current.as_deref().map(|name| original_name(name).to_string());
            *current = restored;
        });
    }
}
