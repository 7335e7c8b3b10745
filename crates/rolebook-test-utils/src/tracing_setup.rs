//! Tracing initialisation helpers for tests.
//!
//! Call [`init_test_tracing`] at the top of any test that wants resolver
//! diagnostics in the test output. The subscriber is installed at most once
//! per process, so every test may call it.

use tracing_subscriber::EnvFilter;

/// Install a subscriber that writes to the test-harness writer and honours
/// `RUST_LOG`, defaulting to `debug` for the Rolebook crates.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rolebook_core=debug")),
        )
        .with_test_writer()
        .try_init();
}
