//! # gqlws-telemetry
//!
//! - [`init_subscriber`] installs the global `tracing` subscriber (stderr,
//!   compact text or JSON lines)
//! - [`capture_logs`] records events in memory for assertions in tests
//! - [`metrics`] holds the Prometheus recorder and metric names

#![deny(unsafe_code)]

pub mod metrics;
pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` wins over `level` when set. Call once at startup; later calls
/// are no-ops.
pub fn init_subscriber(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails if a global subscriber is already set
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.compact().try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_a_noop() {
        init_subscriber("warn", false);
        init_subscriber("debug", true);
    }
}
