//! Persistable detector state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attractor::Attractor;
use super::basin::BasinState;
use super::state::{Dimensions, StateVector};

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume detection where a previous process stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    /// The dimension set the vectors below are laid out in.
    pub dimensions: Dimensions,
    /// Most recent trajectory entries, oldest first.
    pub trajectory_tail: Vec<StateVector>,
    pub total_observations: u64,
    /// Registry contents in ascending id order.
    pub attractors: Vec<Attractor>,
    /// Id the registry will hand out next.
    pub next_attractor_id: u64,
    pub basin: BasinState,
}
