//! Shared setup for integration tests.

use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness. Safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
