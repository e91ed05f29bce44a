//! Per-source-IP rate limiting wired into a `tower` layer.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tallow_relay_ratelimit::RateLimiter;
use tower::{Layer, Service};

use crate::metrics::Metrics;

/// `tower::Layer` that consults a [`RateLimiter`] keyed on the caller's
/// apparent source address before letting a request through.
///
/// The source is taken from `X-Forwarded-For` (first entry), falling back
/// to `X-Real-IP`, falling back to the TCP peer address recorded by
/// [`axum::extract::ConnectInfo`].
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: RateLimiter,
    metrics: Metrics,
}

impl RateLimitLayer {
    pub fn new(limiter: RateLimiter, metrics: Metrics) -> Self {
        Self { limiter, metrics }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: RateLimiter,
    metrics: Metrics,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
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
        let source = source_key(req.headers(), req.extensions().get::<ConnectInfo<SocketAddr>>());
        let limiter = self.limiter.clone();
        let metrics = self.metrics.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if limiter.allow(&source).await {
                inner.call(req).await
            } else {
                metrics.rate_limit_hits_total.inc();
                Ok((StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response())
            }
        })
    }
}

fn source_key(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = value.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    if let Some(value) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !value.trim().is_empty() {
            return value.trim().to_string();
        }
    }
    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_takes_precedence_over_real_ip_and_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.4, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(source_key(&headers, None), "203.0.113.4");
    }

    #[test]
    fn real_ip_is_used_when_forwarded_for_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(source_key(&headers, None), "198.51.100.2");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let conn_info = ConnectInfo(addr);
        assert_eq!(source_key(&headers, Some(&conn_info)), "127.0.0.1");
    }
}
