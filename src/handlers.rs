//! Demo handlers showing each kind of logged outcome.

use crate::handle::RequestLogHandle;
use crate::outcome::Outcome;

use axum::{
    Form, Json,
    extract::{Path, Query},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Redirect},
};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::Instrument;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `GET /` - web route, logged by its URL path.
pub async fn index_handler(log: RequestLogHandle) -> Html<&'static str> {
    log.set_action("Web.index");
    Html("<h1>request-log demo</h1>")
}

/// `GET /users/{id}` - logged as `Users.show` with a template outcome.
pub async fn show_user_handler(log: RequestLogHandle, Path(id): Path<u64>) -> impl IntoResponse {
    log.set_action("Users.show");
    log.set_custom_data(format!("user={id}"));

    let started = Instant::now();
    let body = format!("<h1>User {id}</h1>");
    let render_millis = millis(started.elapsed());

    (
        Outcome::template("users/show.html", render_millis),
        Html(body),
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
}

/// `POST /login` - form with a masked password, answered with a redirect.
pub async fn login_handler(log: RequestLogHandle, Form(form): Form<LoginForm>) -> Redirect {
    log.set_action("Users.login");

    if form.password.is_empty() {
        return Redirect::to("/login?error=empty");
    }

    log.set_custom_data(format!("login={}", form.login));
    Redirect::to("/")
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// `GET /search?q=..` - JSON response, outcome derived from the content type.
pub async fn search_handler(
    log: RequestLogHandle,
    Query(query): Query<SearchQuery>,
) -> Json<serde_json::Value> {
    log.set_action("Search.run");
    Json(json!({ "query": query.q, "results": [] }))
}

/// `GET /download` - attachment, logged as a binary payload.
pub async fn download_handler(log: RequestLogHandle) -> impl IntoResponse {
    log.set_action("Files.download");
    (
        [
            (CONTENT_TYPE, "text/csv"),
            (CONTENT_DISPOSITION, "attachment; filename=\"report.csv\""),
        ],
        "id,name\n1,alice\n",
    )
}

/// `GET /missing` - not found.
pub async fn missing_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// `GET /boom` - panics; logged as a render error.
pub async fn boom_handler() -> &'static str {
    panic!("demo handler failure")
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub delay_ms: Option<u64>,
}

/// `GET /reports/{id}` - answers immediately and finishes in the background.
///
/// The line is written when the background task completes the request.
pub async fn report_handler(
    log: RequestLogHandle,
    Path(id): Path<u64>,
    Query(query): Query<ReportQuery>,
) -> impl IntoResponse {
    log.set_action("Reports.build");
    log.suspend();

    let request_id = log.request_id();
    let delay = Duration::from_millis(query.delay_ms.unwrap_or(50));
    let continuation = log.clone();

    let span = log.span();

    tokio::spawn(
        async move {
            let started = Instant::now();
            tokio::time::sleep(delay).await;
            tracing::debug!(report = id, "report built");
            continuation.set_custom_data(format!("report={id}"));
            continuation.complete(Some(Outcome::view("ReportView", millis(started.elapsed()))));
        }
        .instrument(span),
    );

    (
        StatusCode::ACCEPTED,
        Json(json!({ "report": id, "request_id": request_id })),
    )
}
