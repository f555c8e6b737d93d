//! Destinations for finished log lines and extraction warnings.

use crate::error::ParamError;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Log target of every record written by this crate.
pub const TARGET: &str = "request";

/// Receives finished request lines and side-channel warnings.
///
/// # Implementations
///
/// - [`TracingSink`] - writes through `tracing` under the `request` target
/// - [`MemorySink`] - keeps everything in memory for inspection
#[cfg_attr(test, mockall::automock)]
pub trait LogSink: Send + Sync {
    /// Writes one finished request line.
    fn emit(&self, line: &str);

    /// Reports a parameter block that could not be rendered.
    fn warn(&self, request_id: &str, error: &ParamError);
}

/// Sink backed by the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!(target: TARGET, "{line}");
    }

    fn warn(&self, request_id: &str, error: &ParamError) {
        tracing::warn!(
            target: TARGET,
            request_id = request_id,
            error = %error,
            "Failed to parse request params"
        );
    }
}

/// Sink that records lines and warnings in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }

    /// Returns and clears the recorded lines.
    pub fn take_lines(&self) -> Vec<String> {
        std::mem::take(&mut *lock(&self.lines))
    }
}

impl LogSink for MemorySink {
    fn emit(&self, line: &str) {
        lock(&self.lines).push(line.to_string());
    }

    fn warn(&self, request_id: &str, error: &ParamError) {
        lock(&self.warnings).push(format!("[{request_id}] {error}"));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
