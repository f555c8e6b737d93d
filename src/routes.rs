//! Demo router.
//!
//! # Route Structure
//!
//! - `GET  /`              - Web route, logged by path
//! - `GET  /users/{id}`    - Template outcome with custom data
//! - `POST /login`         - Form post with masked password, redirect
//! - `GET  /search`        - JSON response
//! - `GET  /download`      - Attachment
//! - `GET  /missing`       - 404
//! - `GET  /boom`          - Handler panic
//! - `GET  /reports/{id}`  - Suspended request completed in the background
//!
//! # Middleware
//!
//! - **Request log** - One line per request, see [`crate::middleware`]
//! - **Path normalization** - Trailing slash handling

use crate::handlers::{
    boom_handler, download_handler, index_handler, login_handler, missing_handler,
    report_handler, search_handler, show_user_handler,
};
use crate::middleware;
use crate::pipeline::RequestLog;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Demo routes wrapped with the request log.
pub fn demo_routes(log: Arc<RequestLog>) -> Router {
    let router = Router::new()
        .route("/", get(index_handler))
        .route("/users/{id}", get(show_user_handler))
        .route("/login", post(login_handler))
        .route("/search", get(search_handler))
        .route("/download", get(download_handler))
        .route("/missing", get(missing_handler))
        .route("/boom", get(boom_handler))
        .route("/reports/{id}", get(report_handler));

    middleware::apply(router, log)
}

/// Demo router with trailing-slash normalization, as served by the binary.
pub fn app_router(log: Arc<RequestLog>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(demo_routes(log))
}
