//! Logging setup for the command-line binary

use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr subscriber
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` for this
/// crate and quiet mode only shows warnings.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "crop_catalog=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
