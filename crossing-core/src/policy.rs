//! ## crossing-core::policy
//! **Selection policy for the next grant**
//!
//! Pure decision logic, free of locking so it can be exercised directly:
//!
//! 1. Expedited agents go first whenever any is ready.
//! 2. After `starvation_window` consecutive grants in one direction, a ready
//!    agent of the opposite direction is forced through.
//! 3. Otherwise, if both directions are waiting, prefer the direction opposite
//!    the last grant (or the configured default before any grant).
//! 4. Earliest ready time wins, then lowest id.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, Direction, PriorityClass};

/// Consecutive same-direction grants that trigger a forced switch.
pub const DEFAULT_STARVATION_WINDOW: u32 = 2;

/// Direction used by the fairness rule before anything has been granted.
pub const DEFAULT_DIRECTION: Direction = Direction::West;

/// A ready agent as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: AgentId,
    pub direction: Direction,
    pub priority: PriorityClass,
    pub ready_at: Duration,
}

/// Direction streak of past grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantHistory {
    last_direction: Option<Direction>,
    consecutive: u32,
}

impl GrantHistory {
    pub fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }

    /// Length of the current same-direction streak; 0 before the first grant.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn any_grant_occurred(&self) -> bool {
        self.last_direction.is_some()
    }

    /// Records a grant in `direction`.
    pub fn record(&mut self, direction: Direction) {
        match self.last_direction {
            Some(last) if last == direction => self.consecutive += 1,
            _ => {
                self.last_direction = Some(direction);
                self.consecutive = 1;
            }
        }
    }
}

/// Selection rules. The starvation window is never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    default_direction: Direction,
    starvation_window: u32,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            default_direction: DEFAULT_DIRECTION,
            starvation_window: DEFAULT_STARVATION_WINDOW,
        }
    }
}

impl SelectionPolicy {
    pub fn new(default_direction: Direction, starvation_window: u32) -> Self {
        Self {
            default_direction,
            starvation_window: starvation_window.max(1),
        }
    }

    pub fn default_direction(&self) -> Direction {
        self.default_direction
    }

    pub fn starvation_window(&self) -> u32 {
        self.starvation_window
    }

    /// Picks the next agent to grant. `None` only when `ready` is empty.
    pub fn select(&self, ready: &[Candidate], history: &GrantHistory) -> Option<AgentId> {
        let class = if ready
            .iter()
            .any(|c| c.priority == PriorityClass::Expedited)
        {
            PriorityClass::Expedited
        } else {
            PriorityClass::Standard
        };

        let mut pool: Vec<&Candidate> = ready.iter().filter(|c| c.priority == class).collect();

        let mut narrowed = false;
        if history.consecutive >= self.starvation_window {
            if let Some(last) = history.last_direction {
                let opposite = last.opposite();
                if pool.iter().any(|c| c.direction == opposite) {
                    pool.retain(|c| c.direction == opposite);
                    narrowed = true;
                }
            }
        }

        if !narrowed && spans_both_directions(&pool) {
            let desired = history
                .last_direction
                .map(Direction::opposite)
                .unwrap_or(self.default_direction);
            if pool.iter().any(|c| c.direction == desired) {
                pool.retain(|c| c.direction == desired);
            }
        }

        pool.into_iter()
            .min_by(|a, b| a.ready_at.cmp(&b.ready_at).then(a.id.cmp(&b.id)))
            .map(|c| c.id)
    }
}

fn spans_both_directions(pool: &[&Candidate]) -> bool {
    pool.iter().any(|c| c.direction == Direction::East)
        && pool.iter().any(|c| c.direction == Direction::West)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(id: AgentId, symbol: char, ready_ms: u64) -> Candidate {
        let (direction, priority) = crate::AgentSpec::decode_symbol(symbol).unwrap();
        Candidate {
            id,
            direction,
            priority,
            ready_at: Duration::from_millis(ready_ms),
        }
    }

    fn history(grants: &[Direction]) -> GrantHistory {
        let mut history = GrantHistory::default();
        for &direction in grants {
            history.record(direction);
        }
        history
    }

    #[test]
    fn empty_ready_set_selects_nothing() {
        let policy = SelectionPolicy::default();
        assert_eq!(policy.select(&[], &GrantHistory::default()), None);
    }

    #[test]
    fn zero_starvation_window_is_clamped() {
        let policy = SelectionPolicy::new(Direction::West, 0);
        assert_eq!(policy.starvation_window(), 1);
        assert_eq!(policy.default_direction(), Direction::West);

        // One grant east already forces the switch.
        let ready = [candidate(0, 'e', 0), candidate(1, 'w', 5)];
        assert_eq!(policy.select(&ready, &history(&[Direction::East])), Some(1));
    }

    #[test]
    fn history_tracks_streaks() {
        let mut h = GrantHistory::default();
        assert!(!h.any_grant_occurred());
        assert_eq!(h.consecutive(), 0);

        h.record(Direction::East);
        assert_eq!((h.last_direction(), h.consecutive()), (Some(Direction::East), 1));
        h.record(Direction::East);
        assert_eq!(h.consecutive(), 2);
        h.record(Direction::West);
        assert_eq!((h.last_direction(), h.consecutive()), (Some(Direction::West), 1));
    }

    #[test]
    fn default_direction_applies_before_first_grant() {
        let ready = [candidate(0, 'e', 0), candidate(1, 'w', 0)];

        let west_first = SelectionPolicy::new(Direction::West, 2);
        assert_eq!(west_first.select(&ready, &GrantHistory::default()), Some(1));

        let east_first = SelectionPolicy::new(Direction::East, 2);
        assert_eq!(east_first.select(&ready, &GrantHistory::default()), Some(0));
    }

    #[test]
    fn expedited_beats_earlier_standard() {
        // Agent 0 has waited longer, but agent 2 is expedited.
        let ready = [candidate(0, 'e', 0), candidate(2, 'E', 100)];
        let policy = SelectionPolicy::default();
        assert_eq!(policy.select(&ready, &history(&[Direction::West])), Some(2));
    }

    #[test]
    fn prefers_opposite_of_last_grant() {
        let ready = [candidate(0, 'e', 0), candidate(1, 'w', 50)];
        let policy = SelectionPolicy::default();
        assert_eq!(policy.select(&ready, &history(&[Direction::East])), Some(1));
        assert_eq!(policy.select(&ready, &history(&[Direction::West])), Some(0));
    }

    #[test]
    fn starvation_window_forces_switch_even_within_expedited() {
        let ready = [candidate(0, 'E', 0), candidate(1, 'W', 500)];
        let policy = SelectionPolicy::default();
        let streak = history(&[Direction::East, Direction::East]);
        assert_eq!(policy.select(&ready, &streak), Some(1));
    }

    #[test]
    fn streak_continues_when_opposite_direction_is_absent() {
        let ready = [candidate(4, 'e', 20), candidate(3, 'e', 10)];
        let policy = SelectionPolicy::default();
        let streak = history(&[Direction::East, Direction::East, Direction::East]);
        assert_eq!(policy.select(&ready, &streak), Some(3));
    }

    #[test]
    fn priority_outranks_starvation() {
        // The only westbound agent is standard; an expedited eastbound wins.
        let ready = [candidate(0, 'E', 10), candidate(1, 'w', 0)];
        let policy = SelectionPolicy::default();
        let streak = history(&[Direction::East, Direction::East]);
        assert_eq!(policy.select(&ready, &streak), Some(0));
    }

    #[test]
    fn ties_break_on_ready_time_then_id() {
        let policy = SelectionPolicy::default();
        let ready = [candidate(5, 'w', 30), candidate(4, 'w', 10), candidate(2, 'w', 10)];
        assert_eq!(policy.select(&ready, &GrantHistory::default()), Some(2));
    }

    #[test]
    fn wider_window_delays_forced_switch() {
        let ready = [candidate(0, 'E', 0), candidate(1, 'W', 500)];
        let policy = SelectionPolicy::new(Direction::West, 3);
        let streak = history(&[Direction::East, Direction::East]);
        // Fairness still prefers the opposite direction when both are ready.
        assert_eq!(policy.select(&ready, &streak), Some(1));

        let only_east = [candidate(0, 'E', 0)];
        assert_eq!(policy.select(&only_east, &streak), Some(0));
    }

    fn arb_candidates() -> impl Strategy<Value = Vec<Candidate>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!['e', 'E', 'w', 'W']),
                0u64..5,
            ),
            1..12,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(id, (symbol, ready))| candidate(id, symbol, ready))
                .collect()
        })
    }

    fn arb_history() -> impl Strategy<Value = GrantHistory> {
        prop::collection::vec(
            prop::sample::select(vec![Direction::East, Direction::West]),
            0..6,
        )
        .prop_map(|grants| history(&grants))
    }

    proptest! {
        #[test]
        fn chosen_agent_is_ready(ready in arb_candidates(), h in arb_history()) {
            let chosen = SelectionPolicy::default().select(&ready, &h);
            prop_assert!(chosen.is_some());
            prop_assert!(ready.iter().any(|c| Some(c.id) == chosen));
        }

        #[test]
        fn expedited_always_precedes_standard(ready in arb_candidates(), h in arb_history()) {
            let chosen = SelectionPolicy::default().select(&ready, &h).unwrap();
            let chosen = ready.iter().find(|c| c.id == chosen).unwrap();
            if ready.iter().any(|c| c.priority == PriorityClass::Expedited) {
                prop_assert_eq!(chosen.priority, PriorityClass::Expedited);
            }
        }

        #[test]
        fn no_third_grant_while_opposite_waits(ready in arb_candidates(), h in arb_history()) {
            let chosen = SelectionPolicy::default().select(&ready, &h).unwrap();
            let chosen = ready.iter().find(|c| c.id == chosen).unwrap();
            let class = chosen.priority;
            if let Some(last) = h.last_direction() {
                let opposite_waiting = ready
                    .iter()
                    .any(|c| c.priority == class && c.direction == last.opposite());
                if h.consecutive() >= DEFAULT_STARVATION_WINDOW && opposite_waiting {
                    prop_assert_eq!(chosen.direction, last.opposite());
                }
            }
        }

        #[test]
        fn equal_candidates_go_in_id_order(ids in prop::collection::btree_set(0usize..50, 2..6)) {
            let ready: Vec<Candidate> = ids.iter().rev().map(|&id| candidate(id, 'w', 7)).collect();
            let chosen = SelectionPolicy::default().select(&ready, &GrantHistory::default());
            prop_assert_eq!(chosen, ids.iter().next().copied());
        }
    }
}
