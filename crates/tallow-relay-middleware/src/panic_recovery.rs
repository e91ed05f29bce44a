//! Turn a panicking handler into a `500` response plus a metric instead
//! of taking down the connection.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::metrics::Metrics;

/// `CatchPanicLayer` that increments `panics_total` whenever it has to
/// intervene.
pub fn panic_recovery(metrics: Metrics) -> CatchPanicLayer<impl Fn(Box<dyn std::any::Any + Send>) -> Response<Body> + Clone> {
    CatchPanicLayer::custom(move |panic_payload: Box<dyn std::any::Any + Send>| {
        metrics.panics_total.inc();
        let detail = panic_payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(panic = %detail, "request handler panicked");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    })
}
