//! Internal diagnostics for logwarden
//!
//! The crate reports its own events (sweeper deletions, duplicate sweeper
//! starts, failed subscribers, sink I/O errors) through `tracing`. This is
//! separate from the logger handles it manages.

use tracing_subscriber::EnvFilter;

/// Environment variable overriding the diagnostics filter
pub const LOG_ENV_VAR: &str = "LOGWARDEN_LOG";

/// Build the diagnostics filter: `LOGWARDEN_LOG` if set, else info or debug
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| default_directive(verbose).into())
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "logwarden=debug"
    } else {
        "logwarden=info"
    }
}

/// Initialize internal tracing to stderr
///
/// Call early in main() before any logging occurs. Does nothing if a global
/// subscriber is already installed.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(env_filter(verbose))
        .try_init();
}
