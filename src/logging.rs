//! Logging setup
//!
//! Installs a `tracing` subscriber writing to stderr, so stdout stays free for
//! the account report. Each line carries the emitting thread id.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the requested level is usable
const FALLBACK_FILTER: &str = "info";

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence; otherwise `default_level` (e.g. `"debug"` or
/// `"atm_ledger=trace"`) is used. Returns `false` if a subscriber was already
/// installed, which makes repeated calls harmless.
pub fn init(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(true)
        .with_target(false)
        .try_init()
        .is_ok()
}
