//! Logging initialization.
//!
//! The engine logs through `tracing`. The binary installs a `fmt`
//! subscriber filtered by `RUST_LOG`, falling back to the filter from
//! `engine.yaml`.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set, e.g.
/// `RUST_LOG=commerce_rules=debug`. Calling this twice leaves the first
/// subscriber in place.
///
/// # Example
///
/// ```no_run
/// commerce_rules::logging::init("commerce_rules=info");
/// ```
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// Installs a verbose subscriber that writes through the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
