//! Assembly of the single request log line.
//!
//! ```text
//! <path> <remote> <session>[ <custom>] <method> <params> -> <outcome>[ <N> ms]
//! ```

use crate::context::RequestContext;
use crate::outcome::classify;

use std::time::Instant;

/// Path written to the log: the raw URL path when there is no action or the
/// action belongs to the web prefix, otherwise the action itself.
pub fn resolve_path<'a>(ctx: &'a RequestContext, path_for_action: &str) -> &'a str {
    match ctx.action.as_deref() {
        Some(action) if !action.starts_with(path_for_action) => action,
        _ => &ctx.path,
    }
}

/// `" <N> ms"` measured up to `now`, or empty without a start time.
pub fn elapsed_block(start: Option<Instant>, now: Instant) -> String {
    match start {
        Some(start) => format!(" {} ms", now.saturating_duration_since(start).as_millis()),
        None => String::new(),
    }
}

fn custom_data_block(ctx: &RequestContext) -> String {
    ctx.custom_data()
        .map(|data| format!(" {data}"))
        .unwrap_or_default()
}

/// Formats the line for `ctx` with an already-rendered parameter block.
pub fn format_line(ctx: &RequestContext, params: &str, path_for_action: &str) -> String {
    format_line_at(ctx, params, path_for_action, Instant::now())
}

pub fn format_line_at(
    ctx: &RequestContext,
    params: &str,
    path_for_action: &str,
    now: Instant,
) -> String {
    format!(
        "{path} {remote} {session}{custom} {method} {params} -> {outcome}{elapsed}",
        path = resolve_path(ctx, path_for_action),
        remote = ctx.remote_address,
        session = ctx.session_label(),
        custom = custom_data_block(ctx),
        method = ctx.method,
        params = params,
        outcome = classify(ctx.outcome()),
        elapsed = elapsed_block(ctx.start(), now),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestInfo;
    use crate::outcome::Outcome;
    use std::time::Duration;

    fn info(action: Option<&str>, path: &str) -> RequestInfo {
        RequestInfo {
            action: action.map(str::to_string),
            method: "GET".to_string(),
            path: path.to_string(),
            remote_address: "10.0.0.1".to_string(),
            session_id: None,
            params: Default::default(),
        }
    }

    #[test]
    fn test_web_action_logs_raw_path() {
        let ctx = RequestContext::new("abc-1", info(Some("Web.index"), "/"));
        assert_eq!(resolve_path(&ctx, "Web."), "/");
    }

    #[test]
    fn test_application_action_logs_action() {
        let ctx = RequestContext::new("abc-1", info(Some("MyApp.show"), "/show/1"));
        assert_eq!(resolve_path(&ctx, "Web."), "MyApp.show");
    }

    #[test]
    fn test_missing_action_logs_raw_path() {
        let ctx = RequestContext::new("abc-1", info(None, "/static/app.js"));
        assert_eq!(resolve_path(&ctx, "Web."), "/static/app.js");
    }

    #[test]
    fn test_elapsed_block() {
        let start = Instant::now();
        let now = start + Duration::from_millis(1_234);

        assert_eq!(elapsed_block(Some(start), now), " 1234 ms");
        assert_eq!(elapsed_block(None, now), "");
    }

    #[test]
    fn test_elapsed_never_negative() {
        let now = Instant::now();
        let start = now + Duration::from_millis(5);

        assert_eq!(elapsed_block(Some(start), now), " 0 ms");
    }

    #[test]
    fn test_full_line_layout() {
        let mut ctx = RequestContext::new("abc-1", info(Some("Users.show"), "/users/7"));
        ctx.session_id = Some("sess-9".to_string());
        ctx.set_custom_data("user=7");
        ctx.set_outcome(Outcome::template("users/show.html", 3));
        let now = ctx.start().unwrap() + Duration::from_millis(15);

        let line = format_line_at(&ctx, "id=7\tq=x", "Web.", now);

        assert_eq!(
            line,
            "Users.show 10.0.0.1 sess-9 user=7 GET id=7\tq=x -> RenderTemplate users/show.html 3 ms 15 ms"
        );
    }

    #[test]
    fn test_detached_line_has_no_elapsed_block() {
        let ctx = RequestContext::detached(info(None, "/health"));

        let line = format_line(&ctx, "", "Web.");

        assert_eq!(line, "/health 10.0.0.1 no-session GET  -> RenderError");
    }
}
