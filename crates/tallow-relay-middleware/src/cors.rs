//! Permissive, credential-aware CORS policy shared by every HTTP surface.

use axum::http::Method;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Build a `CorsLayer` that echoes whatever `Origin` the caller sent
/// (rather than a static allow-list), permits credentials, and answers
/// preflight requests for the common verbs and headers the relay's HTTP
/// surfaces use.
///
/// `Any` can't be combined with `allow_credentials(true)`, so origin and
/// request headers are mirrored instead of wildcarded.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
}
