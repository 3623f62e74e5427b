//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default log level chosen by `--verbose` / `--silent`.
pub fn level(verbose: bool, silent: bool) -> &'static str {
    if verbose {
        "debug"
    } else if silent {
        "error"
    } else {
        "info"
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over `level`.
pub fn init(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
