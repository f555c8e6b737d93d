//! Axum adapter for the request log pipeline.
//!
//! # Integration
//!
//! ```rust,ignore
//! let log = Arc::new(RequestLog::new(Config::from_env()));
//! let app = middleware::apply(Router::new().route("/", get(index)), log);
//! ```
//!
//! For each request the middleware:
//!
//! 1. Builds the context: action, method, path, peer address, session id,
//!    query and form parameters
//! 2. Stores a [`RequestLogHandle`] in the request extensions
//! 3. Runs the handler inside the request's `request` span
//! 4. Takes the outcome the handler attached, or derives one from the response
//! 5. Writes the line unless the handler suspended the request
//! 6. Echoes the request id in the `x-request-id` response header

use crate::config::Config;
use crate::context::RequestInfo;
use crate::handle::RequestLogHandle;
use crate::outcome::Outcome;
use crate::params::Params;
use crate::pipeline::RequestLog;
use crate::sink::TARGET;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::Instrument;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Session id provided by an upstream session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Action name provided by an upstream routing layer. Takes precedence over
/// the matched route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionName(pub String);

/// Marks the response produced for a panicking handler.
#[derive(Debug, Clone, Copy)]
struct RenderFailed;

/// Wraps every route of `router` with the request log and a panic guard.
///
/// Add routes (and fallback) before calling this.
pub fn apply<S>(router: Router<S>, log: Arc<RequestLog>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(render_failed))
        .layer(middleware::from_fn_with_state(log, layer))
}

/// Request log middleware; see the module docs.
pub async fn layer(State(log): State<Arc<RequestLog>>, req: Request, next: Next) -> Response {
    let (info, mut req) = request_info(log.config(), req).await;

    let handle = RequestLogHandle::new(log.clone(), log.route_request(info));
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).instrument(handle.span()).await;

    if let Some(outcome) = response.extensions_mut().remove::<Outcome>() {
        handle.set_outcome(outcome);
    } else if !handle.is_pending()
        && !handle.has_outcome()
        && response.extensions().get::<RenderFailed>().is_none()
    {
        handle.set_outcome(derive_outcome(&response));
    }

    handle.finish();

    if let Ok(value) = HeaderValue::from_str(&handle.request_id()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Collects what the pipeline needs from the request, buffering a form body
/// only when its declared length fits the limit. Any other body is passed on
/// untouched and contributes no parameters.
async fn request_info(config: &Config, req: Request) -> (RequestInfo, Request) {
    let extensions = req.extensions();

    let action = extensions
        .get::<ActionName>()
        .map(|a| a.0.clone())
        .or_else(|| extensions.get::<MatchedPath>().map(|p| p.as_str().to_string()));

    let remote_address = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let session_id = extensions
        .get::<SessionId>()
        .map(|s| s.0.clone())
        .or_else(|| cookie_value(req.headers(), &config.session_cookie));

    let mut params = Params::new();
    if let Some(query) = req.uri().query() {
        params.extend_from_urlencoded(query.as_bytes());
    }

    let mut info = RequestInfo {
        action,
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        remote_address,
        session_id,
        params,
    };

    if !is_small_form(req.headers(), config.max_form_bytes) {
        return (info, req);
    }

    let (parts, body) = req.into_parts();
    let body = match to_bytes(body, config.max_form_bytes).await {
        Ok(bytes) => {
            info.params.extend_from_urlencoded(&bytes);
            Body::from(bytes)
        }
        Err(e) => {
            tracing::warn!(target: TARGET, error = %e, "Failed to buffer form body");
            Body::empty()
        }
    };

    (info, Request::from_parts(parts, body))
}

fn is_small_form(headers: &HeaderMap, max_bytes: usize) -> bool {
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));

    let within_limit = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len <= max_bytes);

    is_form && within_limit && max_bytes > 0
}

/// Extracts a cookie value from the `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(COOKIE)
        .and_then(|cookie_header| cookie_header.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str.split(';').find_map(|cookie| {
                let mut parts = cookie.trim().splitn(2, '=');
                match (parts.next(), parts.next()) {
                    (Some(key), Some(value)) if key == name && !value.is_empty() => {
                        Some(value.to_string())
                    }
                    _ => None,
                }
            })
        })
}

/// Classifies a response the handler did not annotate.
pub fn derive_outcome(response: &Response) -> Outcome {
    let status = response.status();
    let headers = response.headers();

    if status.is_redirection()
        && let Some(location) = headers.get(LOCATION).and_then(|v| v.to_str().ok())
    {
        return Outcome::redirect(location);
    }

    if status.is_client_error() || status.is_server_error() {
        return Outcome::error(
            status_kind(status),
            status.canonical_reason().unwrap_or_default(),
        );
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Some(file_name) = attachment_file_name(headers) {
        return Outcome::binary(file_name, content_type);
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => Outcome::other("RenderJson"),
        "text/html" => Outcome::other("RenderHtml"),
        "text/plain" => Outcome::other("RenderText"),
        "application/xml" | "text/xml" => Outcome::other("RenderXml"),
        "application/octet-stream" => Outcome::binary("", content_type),
        _ => Outcome::other(status_kind(status)),
    }
}

/// `404 Not Found` becomes `NotFound`.
fn status_kind(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect(),
        None => format!("Status{}", status.as_u16()),
    }
}

/// File name from `Content-Disposition: attachment; filename="a.pdf"`.
fn attachment_file_name(headers: &HeaderMap) -> Option<String> {
    let disposition = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;

    let mut parts = disposition.split(';').map(str::trim);
    let kind = parts.next()?;
    if !kind.eq_ignore_ascii_case("attachment") {
        return None;
    }

    let file_name = parts
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .unwrap_or_default();

    Some(file_name)
}

/// Response for a handler that panicked: no outcome is recorded, so the
/// request is logged as a render error.
fn render_failed(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };

    tracing::error!(target: TARGET, panic = detail, "Handler panicked");

    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(RenderFailed);
    response
}
