//! Basin assignment and transition tracking.

use chrono::{DateTime, Utc};
use tracing::info;

use super::registry::AttractorRegistry;
use crate::domain::models::state::euclidean_distance;
use crate::domain::models::{BasinAssignment, BasinState, DetectorEvent, EventPayload};

/// Classify `state` against the registry.
///
/// Picks the attractor whose center is nearest; on equal distance the lowest
/// id wins. A pure function of the registry contents and the input.
pub fn assign_basin(
    registry: &AttractorRegistry,
    state: &[f64],
    near_threshold: f64,
) -> BasinAssignment {
    let nearest = registry
        .iter()
        .map(|a| (a.id, euclidean_distance(state, &a.center)))
        .fold(None, |best: Option<(_, f64)>, (id, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((id, d)),
        });

    match nearest {
        None => BasinAssignment::unassigned(),
        Some((id, distance)) => BasinAssignment {
            attractor_id: Some(id),
            distance: Some(distance),
            is_near: distance < near_threshold,
        },
    }
}

/// Remembers the previous basin and counts switches between basins.
#[derive(Debug, Clone, Default)]
pub struct BasinTracker {
    state: BasinState,
}

impl BasinTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn restore(state: BasinState) -> Self {
        Self { state }
    }

    /// Record an assignment; returns a transition event when the nearest
    /// attractor changed to a different one.
    pub fn observe(
        &mut self,
        assignment: &BasinAssignment,
        now: DateTime<Utc>,
    ) -> Option<DetectorEvent> {
        let previous = self.state.current;
        self.state.current = assignment.attractor_id;
        self.state.distance = assignment.distance;

        let to = assignment.attractor_id?;
        if previous == Some(to) {
            return None;
        }

        self.state.basin_transitions += 1;
        let distance = assignment.distance.unwrap_or_default();
        info!(
            from = ?previous.map(|id| id.0),
            to = to.0,
            distance,
            transitions = self.state.basin_transitions,
            "basin transition"
        );

        Some(DetectorEvent::new(
            EventPayload::BasinTransition {
                from: previous,
                to,
                distance,
                transitions: self.state.basin_transitions,
            },
            now,
        ))
    }

    pub const fn state(&self) -> &BasinState {
        &self.state
    }
}
