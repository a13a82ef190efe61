//! Discovered stability patterns.
//!
//! The detectors emit [`Candidate`]s; the registry folds candidates into
//! long-lived [`Attractor`] records, merging repeat sightings of the same
//! pattern instead of duplicating them.
//!
//! ## Kinds
//!
//! - **FixedPoint** -- the window barely moves; the center is its mean.
//! - **LimitCycle** -- the window repeats itself with a period of 2 to 8
//!   observations.
//! - **StrangeAttractor** -- neither of the above, but every dimension stays
//!   inside a bounded range.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::StateVector;

// ---------------------------------------------------------------------------
// AttractorId
// ---------------------------------------------------------------------------

/// Registry-assigned identifier. Ids increase monotonically and are never
/// reused, which makes "lowest id" a stable tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttractorId(pub u64);

impl fmt::Display for AttractorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attractor-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AttractorKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractorKind {
    FixedPoint,
    LimitCycle,
    StrangeAttractor,
}

impl AttractorKind {
    pub const ALL: [Self; 3] = [Self::FixedPoint, Self::LimitCycle, Self::StrangeAttractor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedPoint => "fixed_point",
            Self::LimitCycle => "limit_cycle",
            Self::StrangeAttractor => "strange_attractor",
        }
    }
}

impl fmt::Display for AttractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Observed `[min, max]` of one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Kind-specific detail carried alongside an attractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttractorMetadata {
    /// Fixed points carry nothing beyond their center.
    None,

    LimitCycle {
        /// Number of observations per repetition.
        period: usize,
        /// The last `period` observations of the window that matched.
        cycle_states: Vec<StateVector>,
    },

    StrangeAttractor {
        /// Per-dimension bounds, in dimension order.
        bounds: Vec<Bounds>,
    },
}

impl AttractorMetadata {
    pub fn period(&self) -> Option<usize> {
        match self {
            Self::LimitCycle { period, .. } => Some(*period),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A single detector hit, not yet folded into the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: AttractorKind,
    pub center: Vec<f64>,
    pub strength: f64,
    pub metadata: AttractorMetadata,
}

impl Candidate {
    pub fn fixed_point(center: Vec<f64>, stability: f64) -> Self {
        Self {
            kind: AttractorKind::FixedPoint,
            center,
            strength: stability.clamp(0.0, 1.0),
            metadata: AttractorMetadata::None,
        }
    }

    pub fn limit_cycle(
        center: Vec<f64>,
        similarity: f64,
        period: usize,
        cycle_states: Vec<StateVector>,
    ) -> Self {
        Self {
            kind: AttractorKind::LimitCycle,
            center,
            strength: similarity.clamp(0.0, 1.0),
            metadata: AttractorMetadata::LimitCycle {
                period,
                cycle_states,
            },
        }
    }

    pub fn strange_attractor(center: Vec<f64>, strength: f64, bounds: Vec<Bounds>) -> Self {
        Self {
            kind: AttractorKind::StrangeAttractor,
            center,
            strength: strength.clamp(0.0, 1.0),
            metadata: AttractorMetadata::StrangeAttractor { bounds },
        }
    }
}

// ---------------------------------------------------------------------------
// Attractor
// ---------------------------------------------------------------------------

/// A registered stability pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attractor {
    pub id: AttractorId,
    pub kind: AttractorKind,
    /// Centroid in state space, in dimension order.
    pub center: Vec<f64>,
    /// Confidence that the pattern is real, in `[0, 1]`.
    pub strength: f64,
    pub observation_count: u64,
    pub detected_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub metadata: AttractorMetadata,
}

impl Attractor {
    pub fn from_candidate(id: AttractorId, candidate: Candidate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: candidate.kind,
            center: candidate.center,
            strength: candidate.strength,
            observation_count: 1,
            detected_at: now,
            last_seen: now,
            metadata: candidate.metadata,
        }
    }

    /// Fold a repeat sighting into this record.
    ///
    /// Strength becomes the mean of old and new; cycle and bounds metadata
    /// track the newest sighting. The center and id stay put.
    pub fn absorb(&mut self, candidate: &Candidate, now: DateTime<Utc>) {
        self.strength = (self.strength + candidate.strength) / 2.0;
        self.observation_count += 1;
        self.last_seen = now;
        if candidate.metadata != AttractorMetadata::None {
            self.metadata = candidate.metadata.clone();
        }
    }
}
