//! Per-request correlation state: request ids, timing, and descriptive fields.

use crate::outcome::Outcome;
use crate::params::Params;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Session label used when a request carries no session.
pub const NO_SESSION: &str = "no-session";

/// Generates request ids of the form `<prefix>-<counter>`.
///
/// The prefix is three hex digits chosen at random when the generator is
/// built; the counter starts at 1 and wraps on overflow.
#[derive(Debug)]
pub struct RequestIdGenerator {
    prefix: String,
    counter: AtomicU32,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::with_prefix(format!("{:03x}", rand::random_range(0..0x1000u32)))
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU32::new(1),
        }
    }

    /// Process-wide generator, created on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<RequestIdGenerator>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Self::new())).clone()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// What the surrounding framework knows about a request when it is routed.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// Resolved action identifier, e.g. `Users.show`.
    pub action: Option<String>,
    pub method: String,
    /// Raw URL path.
    pub path: String,
    pub remote_address: String,
    pub session_id: Option<String>,
    pub params: Params,
}

/// Correlation context carried through one request, including across a
/// suspension.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    start: Option<Instant>,
    pub action: Option<String>,
    pub method: String,
    pub path: String,
    pub remote_address: String,
    pub session_id: Option<String>,
    pub params: Params,
    custom_data: Option<String>,
    outcome: Option<Outcome>,
    pending: bool,
    logged: bool,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, info: RequestInfo) -> Self {
        Self::build(request_id.into(), Some(Instant::now()), info)
    }

    /// Context created outside the routing flow: no id, no start time.
    pub fn detached(info: RequestInfo) -> Self {
        Self::build(String::new(), None, info)
    }

    fn build(request_id: String, start: Option<Instant>, info: RequestInfo) -> Self {
        Self {
            request_id,
            start,
            action: info.action,
            method: info.method,
            path: info.path,
            remote_address: info.remote_address,
            session_id: info.session_id,
            params: info.params,
            custom_data: None,
            outcome: None,
            pending: false,
            logged: false,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn start(&self) -> Option<Instant> {
        self.start
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start.map(|start| start.elapsed())
    }

    pub fn session_label(&self) -> &str {
        self.session_id.as_deref().unwrap_or(NO_SESSION)
    }

    pub fn custom_data(&self) -> Option<&str> {
        self.custom_data.as_deref()
    }

    pub fn set_custom_data(&mut self, data: impl Into<String>) {
        self.custom_data = Some(data.into());
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }

    pub fn clear_outcome(&mut self) {
        self.outcome = None;
    }

    /// Marks the request as waiting for an asynchronous continuation.
    pub fn suspend(&mut self) {
        self.pending = true;
    }

    pub fn resume(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_logged(&self) -> bool {
        self.logged
    }

    pub(crate) fn mark_logged(&mut self) {
        self.logged = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_ids_use_prefix_and_start_at_one() {
        let ids = RequestIdGenerator::with_prefix("a1f");

        assert_eq!(ids.next_id(), "a1f-1");
        assert_eq!(ids.next_id(), "a1f-2");
    }

    #[test]
    fn test_random_prefix_is_three_hex_digits() {
        let ids = RequestIdGenerator::new();

        assert_eq!(ids.prefix().len(), 3);
        assert!(ids.prefix().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_shared_generator_is_reused() {
        let a = RequestIdGenerator::shared();
        let b = RequestIdGenerator::shared();

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_counter_wraps_silently() {
        let ids = RequestIdGenerator::with_prefix("fff");
        ids.counter.store(u32::MAX, Ordering::Relaxed);

        assert_eq!(ids.next_id(), format!("fff-{}", u32::MAX));
        assert_eq!(ids.next_id(), "fff-0");
    }

    #[test]
    fn test_concurrent_ids_are_distinct() {
        let generator = RequestIdGenerator::with_prefix("abc");
        let ids = &generator;
        let per_thread = 1_000;
        let threads = 8;

        let all: Vec<String> = thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(move || (0..per_thread).map(|_| ids.next_id()).collect::<Vec<_>>())
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), threads * per_thread);
        assert_eq!(ids.next_id(), format!("abc-{}", threads * per_thread + 1));
    }

    #[test]
    fn test_suspend_and_resume() {
        let mut ctx = RequestContext::new("abc-1", RequestInfo::default());

        assert!(!ctx.is_pending());
        ctx.suspend();
        assert!(ctx.is_pending());
        ctx.resume();
        assert!(!ctx.is_pending());
    }

    #[test]
    fn test_detached_context_has_no_start() {
        let ctx = RequestContext::detached(RequestInfo::default());

        assert!(ctx.start().is_none());
        assert!(ctx.elapsed().is_none());
        assert_eq!(ctx.request_id(), "");
    }

    #[test]
    fn test_session_label() {
        let mut ctx = RequestContext::new("abc-1", RequestInfo::default());
        assert_eq!(ctx.session_label(), "no-session");

        ctx.session_id = Some("s-42".to_string());
        assert_eq!(ctx.session_label(), "s-42");
    }
}
