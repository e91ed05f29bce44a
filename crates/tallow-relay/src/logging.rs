//! `tracing-subscriber` initialization: human-readable by default,
//! JSON when `log_format = "json"`.

use tracing_subscriber::EnvFilter;

pub fn init(log_level: &str, log_format: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::fmt().with_env_filter(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry.json().with_current_span(true).init();
    } else {
        registry.init();
    }
}
