//! Shared `axum`/`tower` middleware stack: security headers, CORS,
//! per-source rate limiting, metrics, request logging, and panic
//! recovery. The relay's onion, rendezvous, and directory HTTP surfaces
//! all layer their routers with these.

mod cors;
mod logging;
mod metrics;
mod panic_recovery;
mod rate_limit;
mod security_headers;

pub use cors::permissive_cors;
pub use logging::request_logging;
pub use metrics::{Metrics, MetricsLayer};
pub use panic_recovery::panic_recovery;
pub use rate_limit::RateLimitLayer;
pub use security_headers::security_headers;
