//! The process-wide Prometheus metric registry and the `axum` layer that
//! feeds HTTP request counters and latency histograms from it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::response::Response;
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder,
};
use tower::{Layer, Service};

/// Every counter and gauge the relay exposes on its metrics endpoint.
///
/// Cloning is cheap: every field is a handle into the shared `Registry`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub active_connections: IntGauge,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub rate_limit_hits_total: IntCounter,
    pub panics_total: IntCounter,
    pub circuits_active: IntGauge,
    pub circuits_created_total: IntCounter,
    pub bytes_forwarded_total: IntCounter,
    pub rooms_active: IntGauge,
    pub rooms_created_total: IntCounter,
    pub rooms_expired_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let active_connections = IntGauge::new("active_connections", "Currently open client connections")
            .expect("metric name is valid");
        let http_requests_total = IntCounterVec::new(
            prometheus::Opts::new("http_requests_total", "Total HTTP requests served"),
            &["method", "path", "status"],
        )
        .expect("metric name is valid");
        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["method", "path"],
        )
        .expect("metric name is valid");
        let rate_limit_hits_total = IntCounter::new("rate_limit_hits_total", "Requests rejected by rate limiting")
            .expect("metric name is valid");
        let panics_total = IntCounter::new("panics_total", "Panics caught while handling requests")
            .expect("metric name is valid");
        let circuits_active = IntGauge::new("circuits_active", "Currently open onion circuits")
            .expect("metric name is valid");
        let circuits_created_total = IntCounter::new("circuits_created_total", "Onion circuits created since startup")
            .expect("metric name is valid");
        let bytes_forwarded_total = IntCounter::new("bytes_forwarded_total", "Bytes relayed across all circuits")
            .expect("metric name is valid");
        let rooms_active = IntGauge::new("rooms_active", "Currently open rendezvous rooms")
            .expect("metric name is valid");
        let rooms_created_total = IntCounter::new("rooms_created_total", "Rendezvous rooms created since startup")
            .expect("metric name is valid");
        let rooms_expired_total = IntCounter::new("rooms_expired_total", "Rendezvous rooms expired or closed since startup")
            .expect("metric name is valid");

        for collector in [
            Box::new(active_connections.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(http_requests_total.clone()),
            Box::new(http_request_duration_seconds.clone()),
            Box::new(rate_limit_hits_total.clone()),
            Box::new(panics_total.clone()),
            Box::new(circuits_active.clone()),
            Box::new(circuits_created_total.clone()),
            Box::new(bytes_forwarded_total.clone()),
            Box::new(rooms_active.clone()),
            Box::new(rooms_created_total.clone()),
            Box::new(rooms_expired_total.clone()),
        ] {
            registry.register(collector).expect("metric is registered exactly once");
        }

        Self {
            registry,
            active_connections,
            http_requests_total,
            http_request_duration_seconds,
            rate_limit_hits_total,
            panics_total,
            circuits_active,
            circuits_created_total,
            bytes_forwarded_total,
            rooms_active,
            rooms_created_total,
            rooms_expired_total,
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .expect("prometheus text encoding never fails for well-formed families");
        String::from_utf8(buf).expect("prometheus text encoding is always valid UTF-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// `tower::Layer` that records `http_requests_total` and
/// `http_request_duration_seconds` for every request it sees.
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Metrics,
}

impl MetricsLayer {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsMiddleware {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetricsMiddleware<S> {
    inner: S,
    metrics: Metrics,
}

impl<S> Service<Request<Body>> for MetricsMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let metrics = self.metrics.clone();
        let start = Instant::now();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(req).await?;
            let elapsed = start.elapsed().as_secs_f64();
            metrics
                .http_request_duration_seconds
                .with_label_values(&[&method, &path])
                .observe(elapsed);
            metrics
                .http_requests_total
                .with_label_values(&[&method, &path, &response.status().as_u16().to_string()])
                .inc();
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_renders_every_declared_family() {
        let metrics = Metrics::new();
        metrics.active_connections.set(3);
        metrics.panics_total.inc();
        let text = metrics.render();
        assert!(text.contains("active_connections"));
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("http_request_duration_seconds"));
        assert!(text.contains("rate_limit_hits_total"));
        assert!(text.contains("panics_total"));
        assert!(text.contains("circuits_active"));
        assert!(text.contains("rooms_expired_total"));
    }
}
