//! Capacity-bounded attractor registry.
//!
//! The registry is the only place attractors are created, merged or evicted.
//! A candidate within `merge_distance` of an existing attractor of the same
//! kind updates that record; otherwise a new record is inserted, pruning the
//! weakest fraction first when the registry is full.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::models::config::DetectorConfig;
use crate::domain::models::state::euclidean_distance;
use crate::domain::models::{Attractor, AttractorId, Candidate};

/// What `upsert` did with a candidate.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    /// The attractor as it stands after the upsert.
    pub attractor: Attractor,
    /// `true` when a new record was inserted, `false` on merge.
    pub created: bool,
    /// Ids pruned to make room for the insert.
    pub evicted: Vec<AttractorId>,
}

#[derive(Debug, Clone)]
pub struct AttractorRegistry {
    attractors: BTreeMap<AttractorId, Attractor>,
    capacity: usize,
    prune_fraction: f64,
    merge_distance: f64,
    next_id: u64,
}

impl AttractorRegistry {
    pub fn new(capacity: usize, prune_fraction: f64, merge_distance: f64) -> Self {
        Self {
            attractors: BTreeMap::new(),
            capacity: capacity.max(1),
            prune_fraction,
            merge_distance,
            next_id: 1,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(
            config.max_attractors,
            config.prune_fraction,
            config.merge_distance,
        )
    }

    /// Merge `candidate` into an existing attractor or insert it.
    pub fn upsert(&mut self, candidate: Candidate, now: DateTime<Utc>) -> UpsertOutcome {
        if let Some(id) = self.find_mergeable(&candidate) {
            if let Some(existing) = self.attractors.get_mut(&id) {
                existing.absorb(&candidate, now);
                debug!(
                    attractor_id = %id,
                    kind = %existing.kind,
                    strength = existing.strength,
                    observations = existing.observation_count,
                    "merged candidate into attractor"
                );
                return UpsertOutcome {
                    attractor: existing.clone(),
                    created: false,
                    evicted: Vec::new(),
                };
            }
        }

        let evicted = if self.attractors.len() >= self.capacity {
            self.prune()
        } else {
            Vec::new()
        };

        let id = AttractorId(self.next_id);
        self.next_id += 1;
        let attractor = Attractor::from_candidate(id, candidate, now);
        self.attractors.insert(id, attractor.clone());

        UpsertOutcome {
            attractor,
            created: true,
            evicted,
        }
    }

    /// Nearest attractor of the same kind within the merge distance.
    fn find_mergeable(&self, candidate: &Candidate) -> Option<AttractorId> {
        let mut best: Option<(AttractorId, f64)> = None;
        for attractor in self.attractors.values() {
            if attractor.kind != candidate.kind {
                continue;
            }
            let distance = euclidean_distance(&attractor.center, &candidate.center);
            if distance > self.merge_distance {
                continue;
            }
            // ascending id iteration keeps the lowest id on ties
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((attractor.id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Evict the weakest `ceil(capacity × prune_fraction)` attractors.
    fn prune(&mut self) -> Vec<AttractorId> {
        let count = self.prune_count().min(self.attractors.len());

        let mut ranked: Vec<(f64, AttractorId)> = self
            .attractors
            .values()
            .map(|a| (a.strength, a.id))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let evicted: Vec<AttractorId> = ranked.into_iter().take(count).map(|(_, id)| id).collect();
        for id in &evicted {
            self.attractors.remove(id);
        }

        debug!(
            evicted = evicted.len(),
            remaining = self.attractors.len(),
            "pruned weakest attractors"
        );
        evicted
    }

    fn prune_count(&self) -> usize {
        let raw = (self.capacity as f64 * self.prune_fraction).ceil();
        // prune_fraction is validated to (0, 1], so raw fits in usize
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = raw as usize;
        count.max(1)
    }

    /// Replace the contents with persisted attractors.
    ///
    /// Oversized input (capacity lowered since the snapshot) keeps the
    /// strongest records.
    pub fn restore(&mut self, attractors: Vec<Attractor>, next_id: u64) {
        let max_id = attractors.iter().map(|a| a.id.0).max().unwrap_or(0);
        self.attractors = attractors.into_iter().map(|a| (a.id, a)).collect();
        self.next_id = next_id.max(max_id + 1);

        if self.attractors.len() > self.capacity {
            let mut ranked: Vec<(f64, AttractorId)> = self
                .attractors
                .values()
                .map(|a| (a.strength, a.id))
                .collect();
            ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let excess = self.attractors.len() - self.capacity;
            for (_, id) in ranked.into_iter().take(excess) {
                self.attractors.remove(&id);
            }
        }
    }

    pub fn get(&self, id: AttractorId) -> Option<&Attractor> {
        self.attractors.get(&id)
    }

    /// Attractors in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Attractor> {
        self.attractors.values()
    }

    pub fn to_vec(&self) -> Vec<Attractor> {
        self.attractors.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.attractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attractors.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn next_id(&self) -> u64 {
        self.next_id
    }
}
