//! ## crossing-telemetry::metrics
//! **Prometheus counters and histograms for crossing transitions**

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub ready: IntCounter,
    pub granted: IntCounterVec,
    pub released: IntCounter,
    pub grant_wait: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let ready = IntCounter::new("crossing_ready_total", "Agents that became ready")?;
        let granted = IntCounterVec::new(
            Opts::new("crossing_granted_total", "Grants of the crossing"),
            &["priority"],
        )?;
        let released = IntCounter::new("crossing_released_total", "Agents that left the crossing")?;
        let grant_wait = Histogram::with_opts(
            HistogramOpts::new(
                "crossing_grant_wait_seconds",
                "Time between becoming ready and being granted",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(ready.clone()))?;
        registry.register(Box::new(granted.clone()))?;
        registry.register(Box::new(released.clone()))?;
        registry.register(Box::new(grant_wait.clone()))?;

        Ok(Self {
            registry,
            ready,
            granted,
            released,
            grant_wait,
        })
    }

    pub fn inc_ready(&self) {
        self.ready.inc();
    }

    pub fn inc_granted(&self, priority: &str, waited_secs: f64) {
        self.granted.with_label_values(&[priority]).inc();
        self.grant_wait.observe(waited_secs);
    }

    pub fn inc_released(&self) {
        self.released.inc();
    }

    /// Prometheus text exposition of every registered metric.
    pub fn gather_metrics(&self) -> Result<String, MetricsError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
