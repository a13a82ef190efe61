//! The online attractor detector.
//!
//! [`AttractorDetector`] owns the trajectory, the registry and the basin
//! tracker for one deployment. `record_state` runs the whole pipeline under
//! a single write lock:
//!
//! 1. normalize the raw observation and append it to the trajectory
//! 2. run the detectors over the sliding window
//! 3. merge or insert every candidate into the registry
//! 4. assign the new state to its nearest basin and count switches
//! 5. hand events and (when due) a snapshot to the persistence queue
//!
//! Step 5 never waits on storage. Read accessors take the read lock and
//! return owned copies.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::basin_tracker::{assign_basin, BasinTracker};
use super::detectors::check_for_attractors;
use super::persistence_worker::{PersistenceCommand, PersistenceHandle};
use super::registry::AttractorRegistry;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    default_rules, Attractor, AttractorId, BasinAssignment, ConfigError, DetectorConfig, DetectorEvent,
    DetectorSnapshot, Dimensions, EventPayload, InferenceRule, PersistenceConfig, RuleTable,
    StateVector, Trajectory, SNAPSHOT_VERSION,
};
use crate::domain::ports::SnapshotStore;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// An attractor touched by a single `record_state` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub attractor: Attractor,
    /// `true` if the call created the attractor, `false` if it merged.
    pub created: bool,
}

/// Everything `record_state` produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// The normalized observation that was appended.
    pub state: StateVector,
    pub detections: Vec<Detection>,
    pub basin: BasinAssignment,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorStats {
    pub total_observations: u64,
    pub trajectory_len: usize,
    pub attractor_count: usize,
    pub attractors_by_kind: BTreeMap<String, usize>,
    pub basin_transitions: u64,
    pub current_basin: Option<AttractorId>,
    pub current_distance: Option<f64>,
    pub snapshots_enqueued: u64,
    pub persistence_dropped: u64,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct DetectorState {
    trajectory: Trajectory,
    registry: AttractorRegistry,
    basin: BasinTracker,
    calls_since_snapshot: u64,
    last_snapshot_at: Instant,
    snapshots_enqueued: u64,
}

impl DetectorState {
    fn new(config: &DetectorConfig) -> Self {
        Self {
            trajectory: Trajectory::new(config.max_trajectory),
            registry: AttractorRegistry::from_config(config),
            basin: BasinTracker::new(),
            calls_since_snapshot: 0,
            last_snapshot_at: Instant::now(),
            snapshots_enqueued: 0,
        }
    }

    fn snapshot(&self, dimensions: &Dimensions, tail: usize, now: DateTime<Utc>) -> DetectorSnapshot {
        DetectorSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: now,
            dimensions: dimensions.clone(),
            trajectory_tail: self.trajectory.window(tail).to_vec(),
            total_observations: self.trajectory.total_recorded(),
            attractors: self.registry.to_vec(),
            next_attractor_id: self.registry.next_id(),
            basin: *self.basin.state(),
        }
    }

    fn snapshot_due(&self, config: &PersistenceConfig) -> bool {
        let by_count = config.snapshot_every > 0 && self.calls_since_snapshot >= config.snapshot_every;
        let by_time = config.snapshot_interval_secs > 0
            && self.last_snapshot_at.elapsed() >= config.snapshot_interval();
        by_count || by_time
    }

    fn mark_snapshot(&mut self) {
        self.calls_since_snapshot = 0;
        self.last_snapshot_at = Instant::now();
        self.snapshots_enqueued += 1;
    }
}

struct PersistenceLink {
    handle: PersistenceHandle,
    config: PersistenceConfig,
}

// ---------------------------------------------------------------------------
// AttractorDetector
// ---------------------------------------------------------------------------

pub struct AttractorDetector {
    config: DetectorConfig,
    rules: RuleTable,
    persistence: Option<PersistenceLink>,
    state: RwLock<DetectorState>,
}

impl AttractorDetector {
    /// Build a detector with an empty trajectory and registry.
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        // the built-in rules only make sense for the built-in dimensions
        let rules = if config.dimensions == Dimensions::default() {
            default_rules()
        } else {
            Vec::new()
        };
        Ok(Self {
            rules: RuleTable::new(config.dimensions.clone(), rules),
            persistence: None,
            state: RwLock::new(DetectorState::new(&config)),
            config,
        })
    }

    /// Use `rules` for [`Self::infer_state`].
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<InferenceRule>) -> Self {
        self.rules = RuleTable::new(self.config.dimensions.clone(), rules);
        self
    }

    /// Route events and periodic snapshots to a persistence worker.
    #[must_use]
    pub fn with_persistence(mut self, handle: PersistenceHandle, config: PersistenceConfig) -> Self {
        self.persistence = Some(PersistenceLink { handle, config });
        self
    }

    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub const fn dimensions(&self) -> &Dimensions {
        &self.config.dimensions
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Ingest one raw observation.
    ///
    /// Missing dimensions default to 50, values are clamped to `[0, 100]`,
    /// unknown keys are ignored. Never fails.
    pub async fn record_state(&self, raw: &HashMap<String, f64>) -> RecordOutcome {
        let now = Utc::now();
        let state = StateVector::from_raw(raw, &self.config.dimensions, now);

        let mut guard = self.state.write().await;
        let inner = &mut *guard;

        let trimmed = inner.trajectory.push(state.clone());
        if trimmed > 0 {
            debug!(trimmed, remaining = inner.trajectory.len(), "trajectory trimmed");
        }

        let candidates =
            check_for_attractors(inner.trajectory.window(self.config.window_size), &self.config);

        let mut events = Vec::new();
        let mut detections = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let outcome = inner.registry.upsert(candidate, now);
            if outcome.created {
                let a = &outcome.attractor;
                info!(
                    attractor_id = a.id.0,
                    kind = %a.kind,
                    strength = a.strength,
                    evicted = outcome.evicted.len(),
                    "attractor detected"
                );
                events.push(DetectorEvent::new(
                    EventPayload::AttractorDetected {
                        attractor_id: a.id,
                        kind: a.kind,
                        strength: a.strength,
                        center: a.center.clone(),
                        evicted: outcome.evicted.clone(),
                    },
                    now,
                ));
            }
            detections.push(Detection {
                attractor: outcome.attractor,
                created: outcome.created,
            });
        }

        let basin = assign_basin(&inner.registry, &state.values, self.config.near_threshold);
        if let Some(event) = inner.basin.observe(&basin, now) {
            events.push(event);
        }

        inner.calls_since_snapshot += 1;
        let snapshot = match &self.persistence {
            Some(link) if inner.snapshot_due(&link.config) => {
                let snapshot =
                    inner.snapshot(&self.config.dimensions, link.config.snapshot_tail, now);
                inner.mark_snapshot();
                Some(snapshot)
            }
            _ => None,
        };
        drop(guard);

        if let Some(link) = &self.persistence {
            for event in events {
                link.handle.submit(PersistenceCommand::Event(event));
            }
            if let Some(snapshot) = snapshot {
                link.handle
                    .submit(PersistenceCommand::Snapshot(Box::new(snapshot)));
            }
        }

        RecordOutcome {
            state,
            detections,
            basin,
        }
    }

    /// Map behavior flags to a raw observation using the rule table.
    pub fn infer_state(&self, flags: &HashMap<String, bool>) -> HashMap<String, f64> {
        self.rules.infer_state(flags)
    }

    /// `infer_state` followed by `record_state`.
    pub async fn record_flags(&self, flags: &HashMap<String, bool>) -> RecordOutcome {
        let raw = self.infer_state(flags);
        self.record_state(&raw).await
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All attractors in ascending id order.
    pub async fn attractors(&self) -> Vec<Attractor> {
        self.state.read().await.registry.to_vec()
    }

    pub async fn attractor(&self, id: AttractorId) -> Option<Attractor> {
        self.state.read().await.registry.get(id).cloned()
    }

    /// The most recently recorded observation.
    pub async fn current_state(&self) -> Option<StateVector> {
        self.state.read().await.trajectory.latest().cloned()
    }

    /// Up to `limit` most recent observations, oldest first.
    pub async fn trajectory(&self, limit: usize) -> Vec<StateVector> {
        self.state.read().await.trajectory.window(limit).to_vec()
    }

    /// Classify an arbitrary state without touching transition tracking.
    pub async fn assign_basin(&self, state: &StateVector) -> BasinAssignment {
        let guard = self.state.read().await;
        assign_basin(&guard.registry, &state.values, self.config.near_threshold)
    }

    pub async fn stats(&self) -> DetectorStats {
        let guard = self.state.read().await;

        let mut attractors_by_kind = BTreeMap::new();
        for attractor in guard.registry.iter() {
            *attractors_by_kind
                .entry(attractor.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        let basin = guard.basin.state();

        DetectorStats {
            total_observations: guard.trajectory.total_recorded(),
            trajectory_len: guard.trajectory.len(),
            attractor_count: guard.registry.len(),
            attractors_by_kind,
            basin_transitions: basin.basin_transitions,
            current_basin: basin.current,
            current_distance: basin.distance,
            snapshots_enqueued: guard.snapshots_enqueued,
            persistence_dropped: self
                .persistence
                .as_ref()
                .map_or(0, |link| link.handle.dropped()),
        }
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Capture the current state. `tail` bounds the trajectory entries kept.
    pub async fn snapshot(&self, tail: usize) -> DetectorSnapshot {
        self.state
            .read()
            .await
            .snapshot(&self.config.dimensions, tail, Utc::now())
    }

    /// Enqueue a snapshot right away and wait for the queue to drain.
    ///
    /// A no-op without persistence.
    pub async fn flush(&self) -> DomainResult<()> {
        let Some(link) = &self.persistence else {
            return Ok(());
        };

        let snapshot = {
            let mut guard = self.state.write().await;
            let snapshot =
                guard.snapshot(&self.config.dimensions, link.config.snapshot_tail, Utc::now());
            guard.mark_snapshot();
            snapshot
        };
        link.handle
            .submit(PersistenceCommand::Snapshot(Box::new(snapshot)));
        link.handle.flush().await
    }

    /// Replace the in-memory state with `snapshot`.
    ///
    /// Rejects snapshots from another layout version or dimension set.
    pub async fn restore(&self, snapshot: DetectorSnapshot) -> DomainResult<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DomainError::CorruptSnapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        if snapshot.dimensions != self.config.dimensions {
            return Err(DomainError::CorruptSnapshot(format!(
                "snapshot dimensions {:?} do not match configured {:?}",
                snapshot.dimensions.names(),
                self.config.dimensions.names()
            )));
        }

        let dims = self.config.dimensions.len();
        let misshapen = snapshot
            .trajectory_tail
            .iter()
            .any(|s| s.values.len() != dims)
            || snapshot.attractors.iter().any(|a| a.center.len() != dims);
        if misshapen {
            return Err(DomainError::CorruptSnapshot(
                "vector length does not match dimension count".to_string(),
            ));
        }

        let mut registry = AttractorRegistry::from_config(&self.config);
        registry.restore(snapshot.attractors, snapshot.next_attractor_id);

        let mut guard = self.state.write().await;
        guard.trajectory = Trajectory::restore(
            snapshot.trajectory_tail,
            self.config.max_trajectory,
            snapshot.total_observations,
        );
        guard.registry = registry;
        guard.basin = BasinTracker::restore(snapshot.basin);
        guard.calls_since_snapshot = 0;
        guard.last_snapshot_at = Instant::now();

        Ok(())
    }

    /// Load the latest snapshot from `store`, if any.
    ///
    /// Fails closed: a missing, unreadable or mismatched snapshot leaves the
    /// detector empty. Returns whether state was restored.
    pub async fn rehydrate(&self, store: &dyn SnapshotStore) -> bool {
        let snapshot = match store.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!("no snapshot found, starting cold");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "failed to load snapshot, starting cold");
                return false;
            }
        };

        let taken_at = snapshot.taken_at;
        match self.restore(snapshot).await {
            Ok(()) => {
                let guard = self.state.read().await;
                info!(
                    %taken_at,
                    attractors = guard.registry.len(),
                    trajectory = guard.trajectory.len(),
                    "rehydrated from snapshot"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "rejected snapshot, starting cold");
                false
            }
        }
    }
}
