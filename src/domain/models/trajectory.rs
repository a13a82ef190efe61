//! Bounded history of observations.

use serde::{Deserialize, Serialize};

use super::state::StateVector;

/// Time-ordered, length-capped sequence of [`StateVector`]s.
///
/// When an append pushes the length past the cap, the oldest half is dropped
/// in one batch so sustained ingestion does not pay for eviction on every
/// call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    states: Vec<StateVector>,
    capacity: usize,
    /// Every observation ever appended, including trimmed ones.
    total_recorded: u64,
}

impl Trajectory {
    pub fn new(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity.min(1024) + 1),
            capacity: capacity.max(1),
            total_recorded: 0,
        }
    }

    /// Rebuild from persisted parts, trimming if the tail exceeds the cap.
    pub fn restore(states: Vec<StateVector>, capacity: usize, total_recorded: u64) -> Self {
        let mut trajectory = Self {
            total_recorded: total_recorded.max(states.len() as u64),
            states,
            capacity: capacity.max(1),
        };
        trajectory.trim();
        trajectory
    }

    /// Append a state and return how many old entries were trimmed.
    pub fn push(&mut self, state: StateVector) -> usize {
        self.states.push(state);
        self.total_recorded += 1;
        self.trim()
    }

    fn trim(&mut self) -> usize {
        if self.states.len() <= self.capacity {
            return 0;
        }
        let drop = self.states.len() / 2;
        self.states.drain(..drop);
        drop
    }

    /// The most recent `size` entries, oldest first.
    pub fn window(&self, size: usize) -> &[StateVector] {
        let start = self.states.len().saturating_sub(size);
        &self.states[start..]
    }

    pub fn latest(&self) -> Option<&StateVector> {
        self.states.last()
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn total_recorded(&self) -> u64 {
        self.total_recorded
    }
}
