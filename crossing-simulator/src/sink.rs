//! Event sink used by the simulator: formatted transition lines, structured
//! logs, metrics and an in-memory record of every event.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crossing_core::{
    AgentId, AgentSpec, EventSink, PriorityClass, RecordingSink, TransitionEvent, TransitionKind,
};
use crossing_telemetry::MetricsRecorder;

pub struct ConsoleSink {
    writer: Option<Mutex<Box<dyn Write + Send>>>,
    metrics: Option<MetricsRecorder>,
    priorities: Vec<PriorityClass>,
    ready_at: Mutex<HashMap<AgentId, Duration>>,
    recorded: RecordingSink,
}

impl ConsoleSink {
    /// Sink printing transition lines to stdout.
    pub fn stdout(specs: &[AgentSpec]) -> Self {
        Self::with_writer(specs, Some(Box::new(std::io::stdout())))
    }

    /// Sink writing transition lines to `writer`, or nowhere if `None`.
    pub fn with_writer(specs: &[AgentSpec], writer: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            writer: writer.map(Mutex::new),
            metrics: None,
            priorities: specs.iter().map(|spec| spec.priority).collect(),
            ready_at: Mutex::new(HashMap::with_capacity(specs.len())),
            recorded: RecordingSink::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Every event emitted so far, in emission order.
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.recorded.events()
    }

    fn record_metrics(&self, metrics: &MetricsRecorder, event: &TransitionEvent) {
        match event.kind {
            TransitionKind::Ready => {
                self.ready_at.lock().insert(event.agent, event.at);
                metrics.inc_ready();
            }
            TransitionKind::Granted => {
                let waited = self
                    .ready_at
                    .lock()
                    .remove(&event.agent)
                    .map_or(Duration::ZERO, |ready| event.at.saturating_sub(ready));
                let priority = self
                    .priorities
                    .get(event.agent)
                    .copied()
                    .unwrap_or(PriorityClass::Standard);
                metrics.inc_granted(priority.label(), waited.as_secs_f64());
            }
            TransitionKind::Released => metrics.inc_released(),
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &TransitionEvent) {
        info!(
            agent = event.agent,
            direction = %event.direction,
            kind = ?event.kind,
            at_ms = event.at.as_millis() as u64,
            "transition"
        );

        if let Some(writer) = &self.writer {
            let mut writer = writer.lock();
            if let Err(e) = writeln!(writer, "{}", event.render()).and_then(|_| writer.flush()) {
                warn!("Failed to write transition line: {e}");
            }
        }

        if let Some(metrics) = &self.metrics {
            self.record_metrics(metrics, event);
        }

        self.recorded.emit(event);
    }
}
