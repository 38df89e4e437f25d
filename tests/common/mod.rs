//! tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kestrel_timewheel=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Tick used by the real-time tests. Small enough to keep the suite fast.
pub const TICK: Duration = Duration::from_millis(20);

/// Slack granted on top of the quantization bound for scheduler jitter.
pub const JITTER: Duration = Duration::from_millis(60);
