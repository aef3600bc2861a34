//! Structured diagnostics, initialized once before any other work.
//!
//! Every module logs through `tracing::{info,warn,error,debug}` rather than
//! `println!`/`eprintln!`, with the exception of the handful of user-facing
//! summary lines `main` prints unconditionally (scan counts, results-file
//! path, reclaimed bytes) to preserve the documented CLI output contract.
//! Verbosity is driven by `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Safe to call at most once;
/// `main` calls it before parsing arguments.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
