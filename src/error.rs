//! Error types for parameter extraction, configuration, and handler extraction.
//!
//! None of these ever abort request handling: [`ParamError`] collapses to an
//! empty parameter block, [`ConfigError`] is reported at startup, and
//! [`HandleRejection`] only fires when a handler asks for a
//! [`crate::RequestLogHandle`] on a route the middleware does not cover.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Failure while rendering the parameter block of a log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// A multi-valued entry carried no values at all.
    #[error("parameter `{name}` has no values")]
    NoValues { name: String },
}

/// Invalid request-log configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("{key} contains invalid characters: '{value}'")]
    InvalidCharacters { key: &'static str, value: String },

    #[error("{key} is out of range (max: {max}), got {value}")]
    OutOfRange {
        key: &'static str,
        value: usize,
        max: usize,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

/// Returned when a handler extracts a [`crate::RequestLogHandle`] but the
/// request never passed through the request-log middleware.
#[derive(Debug, Clone, Copy, Error)]
#[error("request log handle is not attached to this request")]
pub struct HandleRejection;

impl IntoResponse for HandleRejection {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorInfo {
                code: "internal_error",
                message: self.to_string(),
                details: json!({ "hint": "wrap the router with request_log::middleware::apply" }),
            },
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
