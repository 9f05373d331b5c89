//! ## crossing-telemetry::logging
//! **Structured logging with tracing**
//!
//! Diagnostics go to stderr so that stdout only carries transition lines.
//! Thread names are included: agents run on `agent-<id>` threads and the
//! coordinator on `arbiter`.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` overrides `default_level`.
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init(default_level: &str) -> bool {
        fmt()
            .with_env_filter(Self::filter(default_level))
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    }

    fn filter(default_level: &str) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }
}
