//! Tracing configuration for debugging lowering output.
//!
//! ```bash
//! GENLOWER_LOG=debug cargo test
//!
//! # Fine-grained filtering
//! GENLOWER_LOG="genlower::transforms=trace" cargo test
//! ```
//!
//! The subscriber is only initialised when `GENLOWER_LOG` (or `RUST_LOG`) is
//! set, so there is zero overhead in normal builds.

use tracing_subscriber::{EnvFilter, fmt};

/// Build an `EnvFilter` from `GENLOWER_LOG`, falling back to `RUST_LOG`.
fn env_filter() -> Option<EnvFilter> {
    let spec = std::env::var("GENLOWER_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()?;
    if spec.is_empty() {
        return None;
    }
    Some(EnvFilter::new(spec))
}

/// Initialise the global subscriber if a log filter is configured.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    let Some(filter) = env_filter() else {
        return;
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
