//! Basin membership of the current state.

use serde::{Deserialize, Serialize};

use super::attractor::AttractorId;

/// Result of classifying one state against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BasinAssignment {
    /// Nearest attractor, `None` when the registry is empty.
    pub attractor_id: Option<AttractorId>,
    /// Euclidean distance to that attractor's center.
    pub distance: Option<f64>,
    /// Whether `distance` is under the near threshold.
    pub is_near: bool,
}

impl BasinAssignment {
    /// The assignment for an empty registry.
    pub const fn unassigned() -> Self {
        Self {
            attractor_id: None,
            distance: None,
            is_near: false,
        }
    }
}

/// Running basin bookkeeping owned by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BasinState {
    pub current: Option<AttractorId>,
    pub distance: Option<f64>,
    pub basin_transitions: u64,
}
