use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with an env-based filter.
///
/// - Reads `RUST_LOG` for level directives (e.g., "info", "debug,flowq=trace").
/// - Falls back to `default_level` when `RUST_LOG` is unset or invalid.
/// - Writes compact lines to stderr so stdout carries only the run summary.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
