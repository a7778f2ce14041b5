//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Default filter when `PROVENANCE_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "provenance=info";

/// Initialize the logging system.
///
/// Reads `PROVENANCE_LOG` for per-subsystem log levels, e.g.
/// `PROVENANCE_LOG=provenance_storage=debug,provenance_analysis=info`.
///
/// Idempotent: only the first call installs a subscriber. If another global
/// subscriber is already installed (a host application's), that one is kept.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("PROVENANCE_LOG")
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}
