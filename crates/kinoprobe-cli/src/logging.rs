//! Tracing subscriber setup

use crate::config::{LogFormat, Verbosity};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
#[must_use]
pub const fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
        Verbosity::Debug => "debug",
        Verbosity::Trace => "trace",
    }
}

/// Install the global subscriber on stderr.
///
/// `RUST_LOG` wins over the verbosity flags. A second call is a no-op.
pub fn init_tracing(verbosity: Verbosity, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
