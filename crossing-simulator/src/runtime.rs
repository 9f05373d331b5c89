//! Simulation runtime: one thread per agent plus the arbiter thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use crossing_config::SimulationConfig;
use crossing_core::driver::run_agent;
use crossing_core::{
    AgentId, AgentSpec, Arbiter, CrossingError, Decision, EventSink, SelectionPolicy, SimClock,
};

/// A validated population ready to run.
#[derive(Debug, Clone)]
pub struct Simulation {
    specs: Vec<AgentSpec>,
    tick: Duration,
    policy: SelectionPolicy,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub decisions: Vec<Decision>,
    pub wall_time: Duration,
}

/// Aborts the arbiter if the agent thread unwinds.
struct AbortOnPanic<'a> {
    arbiter: &'a Arbiter,
    agent: AgentId,
}

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.arbiter.abort(self.agent, "agent thread panicked");
        }
    }
}

impl Simulation {
    pub fn new(specs: Vec<AgentSpec>, config: &SimulationConfig) -> Self {
        Self::with_policy(specs, config.tick(), config.policy())
    }

    pub fn with_policy(specs: Vec<AgentSpec>, tick: Duration, policy: SelectionPolicy) -> Self {
        Self {
            specs,
            tick,
            policy,
        }
    }

    /// Runs every agent to completion, emitting transitions to `sink`.
    #[instrument(
        skip_all,
        fields(agents = self.specs.len(), tick_ms = self.tick.as_millis() as u64)
    )]
    pub fn run(&self, sink: Arc<dyn EventSink>) -> Result<SimulationOutcome, CrossingError> {
        let started = Instant::now();
        let clock = Arc::new(SimClock::start(self.tick));
        let arbiter = Arc::new(Arbiter::new(self.specs.clone(), self.policy, clock, sink)?);

        let agents = self.spawn_agents(&arbiter)?;
        let coordinator = thread::Builder::new().name("arbiter".into()).spawn({
            let arbiter = Arc::clone(&arbiter);
            move || arbiter.run()
        });
        let coordinator = match coordinator {
            Ok(handle) => handle,
            Err(e) => {
                arbiter.abort(0, format!("failed to spawn arbiter: {e}"));
                return Err(e.into());
            }
        };

        let mut failures = Vec::new();
        for (id, handle) in agents {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(_) => failures.push(CrossingError::AgentPanicked(id)),
            }
        }
        let decisions = match coordinator.join() {
            Ok(result) => result,
            Err(_) => Err(CrossingError::ArbiterPanicked),
        };

        match decisions {
            Ok(decisions) if failures.is_empty() => {
                let wall_time = started.elapsed();
                info!(grants = decisions.len(), ?wall_time, "Simulation complete");
                Ok(SimulationOutcome {
                    decisions,
                    wall_time,
                })
            }
            Ok(_) => Err(root_cause(failures)),
            Err(e) => {
                failures.push(e);
                Err(root_cause(failures))
            }
        }
    }

    fn spawn_agents(
        &self,
        arbiter: &Arc<Arbiter>,
    ) -> Result<Vec<(AgentId, JoinHandle<Result<(), CrossingError>>)>, CrossingError> {
        let mut handles = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let id = spec.id;
            let spawned = thread::Builder::new().name(format!("agent-{id}")).spawn({
                let arbiter = Arc::clone(arbiter);
                move || {
                    let _guard = AbortOnPanic {
                        arbiter: arbiter.as_ref(),
                        agent: id,
                    };
                    let result = run_agent(&arbiter, id);
                    if let Err(e) = &result {
                        arbiter.abort(id, e.to_string());
                    }
                    result
                }
            });
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    error!(agent = id, "Failed to spawn agent thread: {e}");
                    arbiter.abort(id, format!("failed to spawn agent thread: {e}"));
                    return Err(e.into());
                }
            }
        }
        Ok(handles)
    }
}

/// The first failure that is not merely a consequence of an abort.
fn root_cause(failures: Vec<CrossingError>) -> CrossingError {
    let mut fallback = None;
    for failure in failures {
        if matches!(failure, CrossingError::Aborted { .. }) {
            fallback.get_or_insert(failure);
        } else {
            return failure;
        }
    }
    fallback.unwrap_or(CrossingError::ArbiterPanicked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossing_core::{Direction, PriorityClass, RecordingSink, TransitionEvent, TransitionKind};

    const TICK: Duration = Duration::from_millis(10);

    fn spec(id: AgentId, symbol: char, preparation: u32, usage: u32) -> AgentSpec {
        let (direction, priority) = AgentSpec::decode_symbol(symbol).unwrap();
        AgentSpec::new(id, direction, priority, preparation, usage)
    }

    fn run(specs: Vec<AgentSpec>) -> (SimulationOutcome, Vec<TransitionEvent>) {
        run_with(specs, SelectionPolicy::default())
    }

    fn run_with(
        specs: Vec<AgentSpec>,
        policy: SelectionPolicy,
    ) -> (SimulationOutcome, Vec<TransitionEvent>) {
        let sink = Arc::new(RecordingSink::new());
        let outcome = Simulation::with_policy(specs, TICK, policy)
            .run(sink.clone())
            .unwrap();
        (outcome, sink.events())
    }

    fn at(events: &[TransitionEvent], agent: AgentId, kind: TransitionKind) -> Duration {
        events
            .iter()
            .find(|e| e.agent == agent && e.kind == kind)
            .map(|e| e.at)
            .unwrap()
    }

    #[test]
    fn every_agent_completes_with_ordered_events() {
        let specs = vec![
            spec(0, 'e', 1, 2),
            spec(1, 'w', 1, 1),
            spec(2, 'E', 2, 1),
            spec(3, 'W', 3, 2),
            spec(4, 'e', 1, 1),
        ];
        let (outcome, events) = run(specs);

        assert_eq!(outcome.decisions.len(), 5);
        assert_eq!(events.len(), 15);
        for agent in 0..5 {
            let kinds: Vec<_> = events
                .iter()
                .filter(|e| e.agent == agent)
                .map(|e| e.kind)
                .collect();
            assert_eq!(
                kinds,
                vec![
                    TransitionKind::Ready,
                    TransitionKind::Granted,
                    TransitionKind::Released
                ]
            );
            let ready = at(&events, agent, TransitionKind::Ready);
            assert!(ready <= at(&events, agent, TransitionKind::Granted));
        }
    }

    #[test]
    fn usage_intervals_never_overlap() {
        let specs: Vec<_> = ['e', 'w', 'E', 'W', 'e', 'w', 'E', 'W']
            .iter()
            .enumerate()
            .map(|(id, &symbol)| spec(id, symbol, (id % 3) as u32 + 1, 1))
            .collect();
        let (outcome, events) = run(specs);

        let mut intervals: Vec<(Duration, Duration)> = outcome
            .decisions
            .iter()
            .map(|d| {
                (
                    at(&events, d.chosen, TransitionKind::Granted),
                    at(&events, d.chosen, TransitionKind::Released),
                )
            })
            .collect();
        intervals.sort();
        for pair in intervals.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "overlap: {:?}", pair);
        }
    }

    #[test]
    fn decisions_honour_priority_and_starvation_bound() {
        let specs: Vec<_> = (0..10)
            .map(|id| {
                let symbol = ['e', 'e', 'w', 'E', 'e', 'W', 'e', 'w', 'e', 'e'][id];
                spec(id, symbol, 1, 1)
            })
            .collect();
        let (outcome, _) = run(specs);

        for decision in &outcome.decisions {
            if decision
                .ready
                .iter()
                .any(|c| c.priority == PriorityClass::Expedited)
            {
                assert_eq!(decision.priority, PriorityClass::Expedited);
            }

            let history = decision.history_before;
            if let Some(last) = history.last_direction() {
                let opposite_waiting = decision
                    .ready
                    .iter()
                    .any(|c| c.priority == decision.priority && c.direction == last.opposite());
                if history.consecutive() >= 2 && opposite_waiting {
                    assert_eq!(decision.direction, last.opposite());
                }
            }
        }
    }

    #[test]
    fn expedited_agent_overtakes_earlier_standard_agent() {
        // 0 and 1 are ready at once and the default direction picks 1.
        // 2 arrives while 1 is crossing and goes ahead of the waiting 0.
        let specs = vec![spec(0, 'e', 0, 10), spec(1, 'w', 0, 10), spec(2, 'E', 1, 5)];
        let (outcome, events) = run(specs);

        let order: Vec<_> = outcome.decisions.iter().map(|d| d.chosen).collect();
        assert_eq!(order, vec![1, 2, 0]);

        let second = &outcome.decisions[1];
        let waiting: Vec<_> = second.ready.iter().map(|c| c.id).collect();
        assert_eq!(waiting, vec![0, 2]);
        assert!(at(&events, 0, TransitionKind::Ready) < at(&events, 2, TransitionKind::Ready));
        assert!(at(&events, 2, TransitionKind::Granted) < at(&events, 0, TransitionKind::Granted));
    }

    #[test]
    fn east_default_direction_lets_agent_zero_go_first() {
        let specs = vec![spec(0, 'e', 0, 10), spec(1, 'w', 0, 10), spec(2, 'E', 1, 5)];
        let policy = SelectionPolicy::new(Direction::East, 2);
        let (outcome, _) = run_with(specs, policy);

        let order: Vec<_> = outcome.decisions.iter().map(|d| d.chosen).collect();
        assert_eq!(order, vec![0, 2, 1]);
        assert_eq!(outcome.decisions[0].direction, Direction::East);
    }

    #[test]
    fn alternates_direction_after_first_grant() {
        // Agent 0 is alone at the first decision; afterwards both sides wait
        // and the direction opposite the last grant wins.
        let specs = vec![spec(0, 'e', 1, 4), spec(1, 'e', 2, 1), spec(2, 'w', 2, 1)];
        let (outcome, _) = run(specs);
        let order: Vec<_> = outcome.decisions.iter().map(|d| d.chosen).collect();
        assert_eq!(order, vec![0, 2, 1]);
        assert_eq!(outcome.decisions[1].direction, Direction::West);
    }

    #[test]
    fn empty_population_finishes_immediately() {
        let (outcome, events) = run(Vec::new());
        assert!(outcome.decisions.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn root_cause_prefers_real_failures() {
        let failures = vec![
            CrossingError::Aborted {
                agent: 1,
                reason: "x".into(),
            },
            CrossingError::AgentPanicked(1),
        ];
        assert!(matches!(root_cause(failures), CrossingError::AgentPanicked(1)));
    }
}
