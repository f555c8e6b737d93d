//! Terminal results of request handling and their one-line summaries.

use axum::response::{IntoResponseParts, ResponseParts};
use std::convert::Infallible;

/// Summary written when a request completed without any result.
pub const RENDER_ERROR: &str = "RenderError";

/// The result produced by a handler, fixed once the request completes.
///
/// Handlers can attach an outcome to their response directly:
///
/// ```rust,ignore
/// async fn show() -> impl IntoResponse {
///     (Outcome::template("users/show.html", 4), Html(body))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Redirect {
        kind: String,
        url: String,
    },
    Template {
        name: String,
        render_millis: u64,
    },
    View {
        name: String,
        render_millis: u64,
    },
    Binary {
        kind: String,
        file_name: String,
        content_type: String,
    },
    Error {
        kind: String,
        message: String,
    },
    Other {
        kind: String,
    },
}

impl Outcome {
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::redirect_as("Redirect", url)
    }

    /// Redirect with a specific type name, e.g. `RedirectToStatic`.
    pub fn redirect_as(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Redirect {
            kind: kind.into(),
            url: url.into(),
        }
    }

    pub fn template(name: impl Into<String>, render_millis: u64) -> Self {
        Self::Template {
            name: name.into(),
            render_millis,
        }
    }

    pub fn view(name: impl Into<String>, render_millis: u64) -> Self {
        Self::View {
            name: name.into(),
            render_millis,
        }
    }

    pub fn binary(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::Binary {
            kind: "RenderBinary".to_string(),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self::Other { kind: kind.into() }
    }

    /// Type name of the outcome as it appears in the log line.
    pub fn kind(&self) -> &str {
        match self {
            Self::Redirect { kind, .. }
            | Self::Binary { kind, .. }
            | Self::Error { kind, .. }
            | Self::Other { kind } => kind,
            Self::Template { .. } => "RenderTemplate",
            Self::View { .. } => "RenderView",
        }
    }

    /// One-line summary of this outcome.
    pub fn summary(&self) -> String {
        match self {
            Self::Redirect { kind, url } => format!("{kind} {url}"),
            Self::Template {
                name,
                render_millis,
            } => format!("RenderTemplate {name} {render_millis} ms"),
            Self::View {
                name,
                render_millis,
            } => format!("RenderView {name} {render_millis} ms"),
            Self::Binary {
                kind,
                file_name,
                content_type,
            } => [kind.as_str(), file_name.as_str(), content_type.as_str()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Error { kind, message } => format!("{kind} \"{message}\""),
            Self::Other { kind } => kind.clone(),
        }
    }
}

/// Summarizes an optional outcome; a missing one is a render error.
pub fn classify(outcome: Option<&Outcome>) -> String {
    outcome.map_or_else(|| RENDER_ERROR.to_string(), Outcome::summary)
}

impl IntoResponseParts for Outcome {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Infallible> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}
