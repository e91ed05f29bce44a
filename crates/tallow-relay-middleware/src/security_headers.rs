//! A conservative set of security response headers, applied to every
//! HTTP surface the relay exposes.

use axum::extract::Request;
use axum::http::header::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// `axum::middleware::from_fn` handler that stamps a fixed set of
/// security headers onto every response, without overwriting a header a
/// handler already set.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    insert_if_absent(headers, "x-frame-options", "DENY");
    insert_if_absent(headers, "x-content-type-options", "nosniff");
    insert_if_absent(headers, "x-xss-protection", "1; mode=block");
    insert_if_absent(headers, "referrer-policy", "strict-origin-when-cross-origin");
    insert_if_absent(headers, "content-security-policy", "default-src 'self'");
    insert_if_absent(
        headers,
        "permissions-policy",
        "geolocation=(), microphone=(), camera=()",
    );
    headers.remove("server");

    response
}

fn insert_if_absent(headers: &mut axum::http::HeaderMap, name: &'static str, value: &'static str) {
    let header_name = HeaderName::from_static(name);
    if !headers.contains_key(&header_name) {
        headers.insert(header_name, HeaderValue::from_static(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn stamps_every_declared_header() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(security_headers));

        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = resp.headers();
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-xss-protection").unwrap(), "1; mode=block");
        assert_eq!(headers.get("content-security-policy").unwrap(), "default-src 'self'");
        assert!(headers.contains_key("referrer-policy"));
        assert!(headers.contains_key("permissions-policy"));
    }

    #[tokio::test]
    async fn strips_a_server_header_the_handler_set() {
        let app = Router::new()
            .route(
                "/",
                get(|| async {
                    let mut resp = axum::response::Response::new(Body::empty());
                    resp.headers_mut().insert("server", HeaderValue::from_static("leaky/1.0"));
                    resp
                }),
            )
            .layer(axum::middleware::from_fn(security_headers));

        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(!resp.headers().contains_key("server"));
    }
}
