//! Agent lifecycle: prepare -> ready -> await grant -> cross -> release.

use tracing::{debug, instrument};

use crate::agent::AgentId;
use crate::arbiter::Arbiter;
use crate::error::CrossingError;
use crate::events::{TransitionEvent, TransitionKind};

/// Runs one agent to completion. Called once per agent, on its own thread.
#[instrument(skip(arbiter))]
pub fn run_agent(arbiter: &Arbiter, id: AgentId) -> Result<(), CrossingError> {
    let spec = arbiter
        .spec(id)
        .cloned()
        .ok_or_else(|| CrossingError::InvariantViolation {
            agent: id,
            detail: "driver started for an unknown agent".into(),
            state: format!("{} agents", arbiter.agent_count()),
        })?;
    let clock = arbiter.clock();
    let sink = arbiter.sink();

    clock.sleep_ticks(spec.preparation);

    let ready_at = arbiter.register_ready(id)?;
    sink.emit(&TransitionEvent::new(
        TransitionKind::Ready,
        ready_at,
        id,
        spec.direction,
    ));

    arbiter.await_grant(id)?;
    sink.emit(&TransitionEvent::new(
        TransitionKind::Granted,
        clock.elapsed(),
        id,
        spec.direction,
    ));

    clock.sleep_ticks(spec.usage);

    // Emitted before completion so the next grant is always stamped later.
    sink.emit(&TransitionEvent::new(
        TransitionKind::Released,
        clock.elapsed(),
        id,
        spec.direction,
    ));
    arbiter.signal_completion(id)?;

    debug!("agent finished");
    Ok(())
}
