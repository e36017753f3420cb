use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::logging::sink::{LogSink, Severity};

/// Sends records to whatever `tracing` subscriber is installed.
///
/// The component name travels as a `component` field since tracing targets
/// must be known at compile time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, severity: Severity, component: &str, message: &str) {
        match severity {
            Severity::Trace => tracing::trace!(component, "{message}"),
            Severity::Debug => tracing::debug!(component, "{message}"),
            Severity::Info => tracing::info!(component, "{message}"),
            Severity::Warn => tracing::warn!(component, "{message}"),
            Severity::Error => tracing::error!(component, "{message}"),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(default_level: Severity) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level.as_str()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_thread_names(true))
        .with(env_filter)
        .try_init();

    if installed.is_ok() {
        tracing::debug!(level = %default_level, "Logging initialized");
    }
}
