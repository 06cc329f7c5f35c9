//! Logging setup
//!
//! The crate itself only emits `tracing` events; embedding binaries call
//! [`init_logging`] once at startup to install an env-filtered subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`; defaults to debug-level output for this crate
/// and info for everything else.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notekeep=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
