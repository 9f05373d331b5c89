//! ## crossing-core::arbiter
//! **Central coordinator for the single-track crossing**
//!
//! One lock guards the ready registry, the grant history, the completion
//! count and every agent's granted/completed flags. Two kinds of condition
//! variable hang off it:
//!
//! - `activity`: broadcast on every ready transition and every completion,
//!   waited on by the arbiter loop.
//! - one grant signal per agent, notified by the arbiter when that agent is
//!   chosen and released once the agent completes.
//!
//! Selection, removal from the registry and setting the granted flag happen
//! under a single lock acquisition. At most one agent is ever granted and not
//! yet completed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace};

use crate::agent::{AgentId, AgentSlot, AgentSpec, Direction, PriorityClass};
use crate::error::CrossingError;
use crate::events::EventSink;
use crate::policy::{Candidate, GrantHistory, SelectionPolicy};
use crate::registry::ReadyRegistry;
use crate::time::Clock;

/// One grant made by the arbiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// 0-based position in the grant sequence.
    pub sequence: usize,
    pub at: Duration,
    pub chosen: AgentId,
    pub direction: Direction,
    pub priority: PriorityClass,
    /// Every ready agent at the decision point, the chosen one included.
    pub ready: Vec<Candidate>,
    /// Grant history before this decision was applied.
    pub history_before: GrantHistory,
}

struct ArbiterState {
    slots: Vec<AgentSlot>,
    registry: ReadyRegistry,
    history: GrantHistory,
    completed_count: usize,
    /// The agent currently granted and not yet completed.
    occupant: Option<AgentId>,
    decisions: Vec<Decision>,
    aborted: Option<(AgentId, String)>,
}

impl ArbiterState {
    fn all_completed(&self) -> bool {
        self.completed_count >= self.slots.len()
    }

    fn slot(&self, id: AgentId) -> Result<&AgentSlot, CrossingError> {
        self.slots
            .get(id)
            .ok_or_else(|| self.violation(id, "unknown agent"))
    }

    fn slot_mut(&mut self, id: AgentId) -> Result<&mut AgentSlot, CrossingError> {
        if id >= self.slots.len() {
            return Err(self.violation(id, "unknown agent"));
        }
        Ok(&mut self.slots[id])
    }

    fn violation(&self, agent: AgentId, detail: impl Into<String>) -> CrossingError {
        let err = CrossingError::InvariantViolation {
            agent,
            detail: detail.into(),
            state: self.to_string(),
        };
        error!("{err}");
        err
    }

    fn check_aborted(&self) -> Result<(), CrossingError> {
        match &self.aborted {
            Some((agent, reason)) => Err(CrossingError::Aborted {
                agent: *agent,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn candidates(&self) -> Result<Vec<Candidate>, CrossingError> {
        self.registry
            .snapshot_view()
            .iter()
            .map(|&id| {
                let slot = self.slot(id)?;
                let ready_at = slot
                    .ready_at
                    .ok_or_else(|| self.violation(id, "registered without a ready timestamp"))?;
                Ok(Candidate {
                    id,
                    direction: slot.spec.direction,
                    priority: slot.spec.priority,
                    ready_at,
                })
            })
            .collect()
    }
}

impl fmt::Display for ArbiterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "last_direction={:?} consecutive={} completed={}/{} ready={:?} occupant={:?}",
            self.history.last_direction(),
            self.history.consecutive(),
            self.completed_count,
            self.slots.len(),
            self.registry.snapshot_view(),
            self.occupant,
        )
    }
}

/// Sole authority over who may use the crossing.
pub struct Arbiter {
    specs: Vec<AgentSpec>,
    state: Mutex<ArbiterState>,
    activity: Condvar,
    policy: SelectionPolicy,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl Arbiter {
    /// Builds an arbiter for `specs`. Agent ids must equal their position.
    pub fn new(
        specs: Vec<AgentSpec>,
        policy: SelectionPolicy,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, CrossingError> {
        if let Some((index, spec)) = specs.iter().enumerate().find(|(i, s)| s.id != *i) {
            return Err(CrossingError::Config {
                line: index + 1,
                reason: format!("agent id {} does not match its position {index}", spec.id),
            });
        }

        let slots = specs.iter().cloned().map(AgentSlot::new).collect();
        Ok(Self {
            state: Mutex::new(ArbiterState {
                slots,
                registry: ReadyRegistry::with_capacity(specs.len()),
                history: GrantHistory::default(),
                completed_count: 0,
                occupant: None,
                decisions: Vec::with_capacity(specs.len()),
                aborted: None,
            }),
            specs,
            activity: Condvar::new(),
            policy,
            clock,
            sink,
        })
    }

    pub fn agent_count(&self) -> usize {
        self.specs.len()
    }

    pub fn spec(&self, id: AgentId) -> Option<&AgentSpec> {
        self.specs.get(id)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    pub fn completed_count(&self) -> usize {
        self.state.lock().completed_count
    }

    /// Prepare -> ready: stamps the ready time, appends to the registry and
    /// wakes the arbiter. Returns the ready timestamp.
    pub fn register_ready(&self, id: AgentId) -> Result<Duration, CrossingError> {
        let mut state = self.state.lock();
        if state.slot(id)?.ready_at.is_some() {
            return Err(state.violation(id, "registered as ready twice"));
        }

        let stamp = self.clock.elapsed();
        state.slot_mut(id)?.ready_at = Some(stamp);
        state.registry.append(id);
        trace!(agent = id, ready = state.registry.len(), "agent ready");
        self.activity.notify_all();
        Ok(stamp)
    }

    /// Blocks until the arbiter grants `id` the crossing.
    pub fn await_grant(&self, id: AgentId) -> Result<(), CrossingError> {
        let mut state = self.state.lock();
        let signal = match state.slot(id)?.grant_signal.clone() {
            Some(signal) => signal,
            None => return Err(state.violation(id, "awaiting a grant after completion")),
        };
        // Re-checked on every wake; spurious wake-ups just loop.
        while !state.slot(id)?.granted && state.aborted.is_none() {
            signal.wait(&mut state);
        }
        // A grant made before the abort still stands.
        if state.slot(id)?.granted {
            return Ok(());
        }
        state.check_aborted()
    }

    /// Marks `id` as done with the crossing and wakes the arbiter.
    pub fn signal_completion(&self, id: AgentId) -> Result<(), CrossingError> {
        let mut state = self.state.lock();
        let slot = state.slot(id)?;
        if !slot.granted {
            return Err(state.violation(id, "completed without a grant"));
        }
        if slot.completed {
            return Err(state.violation(id, "completed twice"));
        }
        if state.occupant != Some(id) {
            return Err(state.violation(id, "completed while not occupying the crossing"));
        }

        let slot = state.slot_mut(id)?;
        slot.completed = true;
        slot.grant_signal = None;
        state.completed_count += 1;
        state.occupant = None;
        trace!(agent = id, completed = state.completed_count, "agent completed");
        self.activity.notify_all();
        Ok(())
    }

    /// Tears the run down after `agent` failed: the arbiter loop and every
    /// agent still waiting for a grant return [`CrossingError::Aborted`].
    pub fn abort(&self, agent: AgentId, reason: impl Into<String>) {
        let mut state = self.state.lock();
        self.abort_locked(&mut state, agent, reason.into());
    }

    fn abort_locked(&self, state: &mut ArbiterState, agent: AgentId, reason: String) {
        if state.aborted.is_some() {
            return;
        }
        error!(agent, %reason, "aborting simulation");
        state.aborted = Some((agent, reason));
        self.activity.notify_all();
        for signal in state.slots.iter().filter_map(|slot| slot.grant_signal.as_ref()) {
            signal.notify_all();
        }
    }

    /// Decision loop. Returns the grant trace once every agent has completed.
    #[instrument(skip(self), fields(agents = self.specs.len()))]
    pub fn run(&self) -> Result<Vec<Decision>, CrossingError> {
        info!("Arbiter started");
        let mut state = self.state.lock();

        if let Err(err) = self.decide_until_done(&mut state) {
            // Nobody else will grant: release every waiter before bailing out.
            self.abort_locked(&mut state, err.agent().unwrap_or_default(), err.to_string());
            return Err(err);
        }

        info!(grants = state.decisions.len(), "Arbiter finished");
        Ok(std::mem::take(&mut state.decisions))
    }

    fn decide_until_done(
        &self,
        state: &mut MutexGuard<'_, ArbiterState>,
    ) -> Result<(), CrossingError> {
        loop {
            while state.registry.is_empty() && !state.all_completed() && state.aborted.is_none()
            {
                self.activity.wait(state);
            }
            state.check_aborted()?;
            if state.all_completed() {
                return Ok(());
            }

            let chosen = self.select_next(state)?;

            while !state.slot(chosen)?.completed
                && !state.all_completed()
                && state.aborted.is_none()
            {
                self.activity.wait(state);
            }
            state.check_aborted()?;
        }
    }

    /// Chooses, removes and grants the next agent, then signals it.
    fn select_next(&self, state: &mut ArbiterState) -> Result<AgentId, CrossingError> {
        let ready = state.candidates()?;
        let chosen = match self.policy.select(&ready, &state.history) {
            Some(id) => id,
            None => {
                let first = ready.first().map_or(0, |c| c.id);
                return Err(state.violation(first, "no candidate in a non-empty registry"));
            }
        };

        if let Some(occupant) = state.occupant {
            return Err(state.violation(
                chosen,
                format!("selected while agent {occupant} still occupies the crossing"),
            ));
        }
        let slot = state.slot(chosen)?;
        if slot.completed {
            return Err(state.violation(chosen, "selected after completion"));
        }
        if slot.granted {
            return Err(state.violation(chosen, "selected twice"));
        }
        let (direction, priority) = (slot.spec.direction, slot.spec.priority);

        state.registry.remove(chosen);
        let history_before = state.history;
        state.history.record(direction);
        state.occupant = Some(chosen);

        let slot = state.slot_mut(chosen)?;
        slot.granted = true;
        let signal = slot.grant_signal.clone();

        debug!(
            agent = chosen,
            direction = %direction,
            priority = priority.label(),
            candidates = ready.len(),
            streak = state.history.consecutive(),
            "granted crossing"
        );

        let sequence = state.decisions.len();
        state.decisions.push(Decision {
            sequence,
            at: self.clock.elapsed(),
            chosen,
            direction,
            priority,
            ready,
            history_before,
        });

        match signal {
            Some(signal) => {
                signal.notify_one();
                Ok(chosen)
            }
            None => Err(state.violation(chosen, "grant signal already released")),
        }
    }
}
