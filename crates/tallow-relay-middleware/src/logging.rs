//! Request logging: `GET /health` and `GET /ready` are demoted to
//! `debug` so liveness probes don't flood the `info` stream.

use axum::extract::MatchedPath;
use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing::Span;

const QUIET_PATHS: &[&str] = &["/health", "/ready"];

fn span_for_request<B>(req: &Request<B>) -> Span {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str())
        .unwrap_or_else(|| req.uri().path());
    if QUIET_PATHS.contains(&path) {
        tracing::debug_span!("http_request", method = %req.method(), %path)
    } else {
        tracing::info_span!("http_request", method = %req.method(), %path)
    }
}

/// A `TraceLayer` whose span level varies with the request path so
/// health-check traffic doesn't dominate `info`-level logs.
pub fn request_logging<B>() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request<B>) -> Span> {
    TraceLayer::new_for_http().make_span_with(span_for_request as fn(&Request<B>) -> Span)
}
