//! # Observability
//!
//! Logging goes through `tracing`. The controller opens one `api_request`
//! span per request and logs each pipeline stage at `debug`; rejected
//! requests log at `warn` and internal failures at `error`.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "aeroapi=info,tower_http=info";

/// Initializes the tracing subscriber.
///
/// Verbosity follows `RUST_LOG` (e.g. `RUST_LOG=aeroapi=debug`), falling
/// back to [`DEFAULT_LOG_FILTER`]. Calling this twice is harmless; the
/// second call leaves the first subscriber in place.
pub fn setup_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
