//! The metrics HTTP surface: a single route rendering the Prometheus text
//! exposition format, served on its own port so scraping never competes
//! with the relay's client-facing traffic.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use tallow_relay_middleware::Metrics;

pub fn router(metrics: Metrics, path: &str) -> Router {
    Router::new().route(path, get(render)).with_state(metrics)
}

async fn render(State(metrics): State<Metrics>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}
