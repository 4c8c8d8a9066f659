//! Logging setup

use tracing_subscriber::EnvFilter;

/// Filter directives used when `RUST_LOG` is not set.
///
/// With `debug` set, every watcher event (calls, skips, subscriptions) is
/// shown; otherwise only warnings and errors.
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "warn,fos_watch=debug,fos_brand=debug"
    } else {
        "warn"
    }
}

/// `RUST_LOG` when set, [`default_directives`] otherwise
pub fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

/// Install a `tracing` fmt subscriber filtered by [`env_filter`].
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(debug: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_target(true)
        .try_init()
        .is_ok()
}
