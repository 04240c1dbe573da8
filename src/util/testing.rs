//! Shared test setup.

use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

/// Install a stderr subscriber once per test binary.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at debug level.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orgchart=debug"));

        let layer = fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter);

        if tracing::dispatcher::has_been_set() {
            debug!("Tracing subscriber already set");
        } else if let Err(e) = tracing_subscriber::registry().with(layer).try_init() {
            eprintln!("Error: Failed to set up logging: {}", e);
        }
    });
}
