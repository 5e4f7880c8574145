// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup and local runtime access for integration tests.

use bridgekeeper::runtime::{BollardRuntime, detect_local};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("bridgekeeper=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Get local runtime, or `None` if no socket is available.
#[allow(dead_code)]
pub fn local_runtime() -> Option<BollardRuntime> {
    let endpoint = detect_local(None).ok()?;
    BollardRuntime::connect(&endpoint).ok()
}

/// Skip test if no local runtime available.
macro_rules! require_runtime {
    () => {
        match support::local_runtime() {
            Some(rt) => rt,
            None => {
                eprintln!("Skipping test: no local container runtime found");
                return;
            }
        }
    };
}
