//! Append-only audit events emitted by the detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attractor::{AttractorId, AttractorKind};

/// One discrete, timestamped detector event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventPayload {
    /// A new attractor entered the registry.
    AttractorDetected {
        attractor_id: AttractorId,
        kind: AttractorKind,
        strength: f64,
        center: Vec<f64>,
        /// Attractors evicted to make room, if the registry was full.
        evicted: Vec<AttractorId>,
    },

    /// The nearest attractor changed.
    BasinTransition {
        from: Option<AttractorId>,
        to: AttractorId,
        distance: f64,
        transitions: u64,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AttractorDetected { .. } => "attractor_detected",
            Self::BasinTransition { .. } => "basin_transition",
        }
    }
}

impl DetectorEvent {
    pub fn new(payload: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            payload,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
