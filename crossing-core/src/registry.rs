//! Ready registry: agents that finished preparing and await the crossing.
//!
//! Only ever touched while holding the arbiter's lock, so it carries no
//! synchronization of its own.

use crate::agent::AgentId;

#[derive(Debug, Default, Clone)]
pub struct ReadyRegistry {
    ids: Vec<AgentId>,
}

impl ReadyRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Appends a newly ready agent. O(1).
    #[inline]
    pub fn append(&mut self, id: AgentId) {
        self.ids.push(id);
    }

    /// Read-only view in insertion order.
    #[inline]
    pub fn snapshot_view(&self) -> &[AgentId] {
        &self.ids
    }

    /// Removes `id`, returning whether it was present. O(n).
    pub fn remove(&mut self, id: AgentId) -> bool {
        match self.ids.iter().position(|&ready| ready == id) {
            Some(index) => {
                self.ids.remove(index);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
