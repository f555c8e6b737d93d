//! # Request Log
//!
//! Per-request access logging for Axum services. Every handled request
//! produces exactly one line on the `request` log target:
//!
//! ```text
//! Users.show 10.0.0.1 sess-9 user=7 GET id=7 -> RenderTemplate users/show.html 3 ms 15 ms
//! ```
//!
//! ## Architecture
//!
//! - **Correlation** ([`context`], [`worker`]) - request ids, timing, worker labels
//! - **Outcomes** ([`outcome`]) - terminal results and their summaries
//! - **Parameters** ([`params`]) - ordered parameters, skipping and masking
//! - **Formatting** ([`format`]) - assembly of the log line
//! - **Pipeline** ([`pipeline`], [`handle`], [`sink`]) - lifecycle hooks and output
//! - **Axum adapter** ([`middleware`]) - wiring into a router
//!
//! ## Features
//!
//! - Request ids that are unique for the process lifetime
//! - Case-insensitive masking of sensitive parameters such as passwords
//! - Suspended requests are logged once, when their continuation completes
//! - Handler panics are logged as render errors
//!
//! ## Quick Start
//!
//! ```bash
//! export REQUEST_LOG_MASK_PARAMS="password|token"
//! cargo run
//! curl -d 'login=bob&password=secret' localhost:3000/login
//! ```
//!
//! ## Configuration
//!
//! See [`config::Config`] for the available options.

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod handle;
pub mod middleware;
pub mod outcome;
pub mod params;
pub mod pipeline;
pub mod sink;
pub mod worker;

pub mod handlers;
pub mod routes;
pub mod server;

pub use handle::RequestLogHandle;
pub use outcome::Outcome;
pub use pipeline::RequestLog;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::{RequestContext, RequestIdGenerator, RequestInfo};
    pub use crate::handle::RequestLogHandle;
    pub use crate::middleware::{ActionName, SessionId};
    pub use crate::outcome::Outcome;
    pub use crate::params::{MaskRules, Params};
    pub use crate::pipeline::RequestLog;
    pub use crate::sink::{LogSink, MemorySink, TracingSink};
}
