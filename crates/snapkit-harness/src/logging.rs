//! Tracing setup for test binaries.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::HarnessError;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "snapkit=info";

/// Install the global subscriber, ignoring a second installation.
pub fn init() {
    let _ = try_init();
}

/// Install a formatting subscriber filtered by `RUST_LOG`, writing through
/// the test harness's captured output.
pub fn try_init() -> Result<(), HarnessError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_test_writer()
        .try_init()
        .map_err(|e| HarnessError::Config(format!("tracing subscriber: {e}")))
}
