//! ## crossing-core::events
//! **Transition events and the sink they are emitted to**
//!
//! Every agent emits exactly three events: ready, granted, released. Ordering
//! is guaranteed per agent only; events of unrelated agents may interleave.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, Direction};
use crate::time::format_elapsed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Ready,
    Granted,
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub kind: TransitionKind,
    pub at: Duration,
    pub agent: AgentId,
    pub direction: Direction,
}

impl TransitionEvent {
    pub fn new(kind: TransitionKind, at: Duration, agent: AgentId, direction: Direction) -> Self {
        Self {
            kind,
            at,
            agent,
            direction,
        }
    }

    /// Human readable line, e.g. `00:00:01.0 Agent  2 is ready to go East`.
    pub fn render(&self) -> String {
        let time = format_elapsed(self.at);
        let direction = self.direction.label();
        match self.kind {
            TransitionKind::Ready => {
                format!("{time} Agent {:>2} is ready to go {direction:>4}", self.agent)
            }
            TransitionKind::Granted => {
                format!("{time} Agent {:>2} is ON the crossing going {direction:>4}", self.agent)
            }
            TransitionKind::Released => format!(
                "{time} Agent {:>2} is OFF the crossing after going {direction:>4}",
                self.agent
            ),
        }
    }
}

/// Destination for transition events. Called from agent threads, outside
/// the arbiter's lock.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &TransitionEvent);
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TransitionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().clone()
    }

    /// Events of one agent, in emission order.
    pub fn events_for(&self, agent: AgentId) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.agent == agent)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &TransitionEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_transition_lines() {
        let ready = TransitionEvent::new(
            TransitionKind::Ready,
            Duration::from_millis(1_000),
            2,
            Direction::East,
        );
        assert_eq!(ready.render(), "00:00:01.0 Agent  2 is ready to go East");

        let granted = TransitionEvent::new(
            TransitionKind::Granted,
            Duration::from_millis(1_000),
            12,
            Direction::West,
        );
        assert_eq!(
            granted.render(),
            "00:00:01.0 Agent 12 is ON the crossing going West"
        );

        let released = TransitionEvent::new(
            TransitionKind::Released,
            Duration::from_millis(1_500),
            2,
            Direction::East,
        );
        assert_eq!(
            released.render(),
            "00:00:01.5 Agent  2 is OFF the crossing after going East"
        );
    }

    #[test]
    fn recording_sink_filters_by_agent() {
        let sink = RecordingSink::new();
        assert!(sink.is_empty());
        for (agent, kind) in [
            (0, TransitionKind::Ready),
            (1, TransitionKind::Ready),
            (0, TransitionKind::Granted),
        ] {
            sink.emit(&TransitionEvent::new(kind, Duration::ZERO, agent, Direction::West));
        }
        assert_eq!(sink.len(), 3);
        let kinds: Vec<_> = sink.events_for(0).into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![TransitionKind::Ready, TransitionKind::Granted]);
    }
}
