//! axum integration.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use c3::{C3Config, C3};
//!
//! async fn index() -> &'static str {
//!     c3::hit!();
//!     "ok"
//! }
//!
//! let c3 = C3::new(C3Config::new("."));
//! let app = c3::instrument(Router::new().route("/", get(index)), c3);
//! # let _: Router = app;
//! ```
//!
//! Requests without a coverage signal pass straight through. Armed requests
//! either hit the report route or run the application with a probe installed
//! and are merged into the persisted snapshot before the response leaves.

use crate::coverage::Probe;
use crate::dispatch::Route;
use crate::report::ReportFormat;
use crate::result::C3Error;
use crate::service::{ReportOutcome, C3};
use crate::signals::{RequestContext, ERROR_COOKIE, ERROR_HEADER};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::{debug, warn};

/// Layer the coverage coordinator over `router`
pub fn instrument<S>(router: Router<S>, c3: C3) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(c3, coverage_middleware))
}

/// Middleware function behind [`instrument`]
pub async fn coverage_middleware(State(c3): State<C3>, req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_parts(req.uri().path(), req.headers());
    if ctx.coverage_label().is_none() {
        return next.run(req).await;
    }

    match Route::parse(ctx.path()) {
        Route::Report(route) => {
            let outcome = {
                let c3 = c3.clone();
                let ctx = ctx.clone();
                tokio::task::spawn_blocking(move || c3.report(&ctx, &route)).await
            };
            match flatten(outcome) {
                Ok(outcome) => report_response(outcome),
                Err(err) => fail(&c3, &ctx, &err, req, next).await,
            }
        }
        Route::Collect => collect(c3, ctx, req, next).await,
    }
}

async fn collect(c3: C3, ctx: RequestContext, mut req: Request, next: Next) -> Response {
    let armed = {
        let c3 = c3.clone();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || c3.arm(&ctx)).await
    };
    let armed = match flatten(armed) {
        Ok(armed) => armed,
        Err(err) => return fail(&c3, &ctx, &err, req, next).await,
    };

    let response = match armed.probe() {
        Some(probe) => {
            let _ = req.extensions_mut().insert(probe.clone());
            probe.scope(next.run(req)).await
        }
        None => next.run(req).await,
    };

    match flatten(tokio::task::spawn_blocking(move || armed.finish()).await) {
        Ok(()) => response,
        Err(err) => {
            let message = c3.record_error(&ctx, &err);
            with_error(response, &message)
        }
    }
}

/// Handle a fatal error: log it, then answer 500 with the error header and
/// cookie. In debug mode the application still runs and its response
/// carries the header and cookie instead.
async fn fail(c3: &C3, ctx: &RequestContext, err: &C3Error, req: Request, next: Next) -> Response {
    let message = c3.record_error(ctx, err);
    if ctx.is_debug() {
        debug!(error = %message, "debug mode, continuing without coverage");
        return with_error_headers(next.run(req).await, &message);
    }
    with_error(Response::new(Body::empty()), &message)
}

fn with_error(response: Response, message: &str) -> Response {
    let mut response = with_error_headers(response, message);
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn with_error_headers(mut response: Response, message: &str) -> Response {
    let flat = message.replace(['\r', '\n'], " ");
    let headers = response.headers_mut();
    let visible: String = flat
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect();
    if let Ok(value) = HeaderValue::from_str(&visible) {
        let _ = headers.insert(ERROR_HEADER, value);
    }
    let cookie = format!(
        "{ERROR_COOKIE}={}; Path=/",
        utf8_percent_encode(&flat, NON_ALPHANUMERIC)
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        let _ = headers.append(header::SET_COOKIE, value);
    }
    response
}

fn report_response(outcome: ReportOutcome) -> Response {
    match outcome {
        ReportOutcome::Cleared => StatusCode::OK.into_response(),
        ReportOutcome::Artifact { format, body, .. } => {
            ([(header::CONTENT_TYPE, content_type(format))], body).into_response()
        }
        ReportOutcome::Unknown(action) => {
            warn!(action = %action, "unknown report action");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

const fn content_type(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Html | ReportFormat::Phpunit => "application/x-tar",
        ReportFormat::Serialized => "application/json",
        ReportFormat::Clover | ReportFormat::Crap4j | ReportFormat::Cobertura => "application/xml",
    }
}

fn flatten<T>(joined: Result<Result<T, C3Error>, tokio::task::JoinError>) -> Result<T, C3Error> {
    joined.unwrap_or_else(|e| Err(C3Error::Io(std::io::Error::other(e))))
}

/// Probe of the current request, for handlers that spawn tasks
#[derive(Debug, Clone)]
pub struct CurrentProbe(pub Option<Probe>);

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CurrentProbe {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Probe>().cloned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_error_sets_header_cookie_status() {
        let response = with_error(Response::new(Body::empty()), "line one\nline two");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[ERROR_HEADER].to_str().unwrap(),
            "line one line two"
        );
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("CODECEPTION_CODECOVERAGE_ERROR=line%20one%20line%20two"));
    }

    #[test]
    fn test_error_headers_keep_status() {
        let response = with_error_headers(StatusCode::OK.into_response(), "config missing");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[ERROR_HEADER].to_str().unwrap(),
            "config missing"
        );
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }

    #[test]
    fn test_unknown_report_action_is_not_found() {
        let response = report_response(ReportOutcome::Unknown("pdf".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(ReportFormat::Html), "application/x-tar");
        assert_eq!(content_type(ReportFormat::Clover), "application/xml");
    }
}
