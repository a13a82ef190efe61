//! End-to-end detector behavior through the public API.

use std::collections::HashMap;
use std::sync::Arc;

use basin_watch::domain::models::{BasinAssignment, Candidate, EventPayload};
use basin_watch::services::{assign_basin, AttractorRegistry, BasinTracker};
use basin_watch::{
    AttractorDetector, AttractorId, AttractorKind, DetectorConfig, InMemorySnapshotStore,
    PersistenceConfig, PersistenceWorker, SnapshotStore,
};
use chrono::Utc;

const DIMS: [&str; 5] = ["focus", "pace", "depth", "breadth", "risk"];

fn uniform(value: f64) -> HashMap<String, f64> {
    DIMS.iter().map(|d| ((*d).to_string(), value)).collect()
}

fn detector() -> AttractorDetector {
    AttractorDetector::new(DetectorConfig::default()).unwrap()
}

#[tokio::test]
async fn test_steady_state_becomes_fixed_point_on_eighth_call() {
    let detector = detector();

    for call in 1..=10 {
        let outcome = detector.record_state(&uniform(80.0)).await;
        if call < 8 {
            assert!(outcome.detections.is_empty(), "call {call} detected too early");
        }
        if call == 8 {
            let kinds: Vec<AttractorKind> =
                outcome.detections.iter().map(|d| d.attractor.kind).collect();
            assert_eq!(kinds, vec![AttractorKind::FixedPoint, AttractorKind::LimitCycle]);
            for detection in &outcome.detections {
                assert!(detection.created);
                assert_eq!(detection.attractor.center, vec![80.0; 5]);
                assert!((detection.attractor.strength - 1.0).abs() < 1e-12);
            }
            assert_eq!(outcome.detections[1].attractor.metadata.period(), Some(2));
        }
    }

    let attractors = detector.attractors().await;
    assert_eq!(attractors.len(), 2);
    assert!(attractors.iter().all(|a| a.observation_count == 3));
}

#[tokio::test]
async fn test_alternating_states_become_period_two_cycle() {
    let detector = detector();

    for step in 0..20 {
        let value = if step % 2 == 0 { 20.0 } else { 80.0 };
        detector.record_state(&uniform(value)).await;
    }

    let cycles: Vec<_> = detector
        .attractors()
        .await
        .into_iter()
        .filter(|a| a.kind == AttractorKind::LimitCycle)
        .collect();
    // the center is the first state of the matched cycle, so each phase of
    // the alternation registers once and later sightings merge into it
    assert_eq!(cycles.len(), 2);
    assert!(cycles.iter().all(|a| a.metadata.period() == Some(2)));
    let mut centers: Vec<f64> = cycles.iter().map(|a| a.center[0]).collect();
    centers.sort_by(f64::total_cmp);
    assert_eq!(centers, vec![20.0, 80.0]);
    assert_eq!(cycles.iter().map(|a| a.observation_count).sum::<u64>(), 13);
}

#[tokio::test]
async fn test_nearby_states_reinforce_existing_attractors() {
    let detector = detector();
    for _ in 0..10 {
        detector.record_state(&uniform(80.0)).await;
    }
    let before = detector.attractors().await;
    assert_eq!(before.len(), 2);

    for _ in 0..10 {
        detector.record_state(&uniform(85.0)).await;
    }

    let after = detector.attractors().await;
    assert_eq!(after.len(), 2, "no new attractor");
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.observation_count, b.observation_count + 10);
    }
}

#[test]
fn test_registry_capacity_keeps_strongest_of_forty() {
    let mut registry = AttractorRegistry::new(32, 0.24, 20.0);
    let now = Utc::now();

    for i in 0..40u32 {
        let center = vec![f64::from(i) * 30.0];
        let strength = f64::from(i + 1) / 40.0;
        registry.upsert(Candidate::fixed_point(center, strength), now);
        assert!(registry.len() <= 32);
    }

    assert_eq!(registry.len(), 32);
    let ids: Vec<u64> = registry.iter().map(|a| a.id.0).collect();
    assert_eq!(ids, (9..=40).collect::<Vec<_>>());
}

#[test]
fn test_empty_registry_assigns_nothing() {
    let registry = AttractorRegistry::new(32, 0.24, 20.0);
    let assignment = assign_basin(&registry, &[50.0; 5], 30.0);
    assert_eq!(assignment, BasinAssignment::unassigned());
    assert_eq!(assignment.attractor_id, None);
    assert_eq!(assignment.distance, None);
    assert!(!assignment.is_near);
}

#[test]
fn test_nearest_basin_and_single_transition() {
    let now = Utc::now();
    let mut registry = AttractorRegistry::new(32, 0.24, 20.0);
    let near = registry
        .upsert(Candidate::fixed_point(vec![50.0, 50.0], 0.9), now)
        .attractor
        .id;
    let far = registry
        .upsert(Candidate::fixed_point(vec![50.0, 10.0], 0.9), now)
        .attractor
        .id;
    assert_ne!(near, far);

    let state = [50.0, 60.0];
    let assignment = assign_basin(&registry, &state, 30.0);
    assert_eq!(assignment.attractor_id, Some(near));
    assert!((assignment.distance.unwrap() - 10.0).abs() < 1e-9);
    assert!(assignment.is_near);

    let mut tracker = BasinTracker::new();
    let event = tracker.observe(&assignment, now).expect("first basin is a transition");
    assert_eq!(tracker.state().basin_transitions, 1);
    assert!(matches!(
        event.payload,
        EventPayload::BasinTransition { from: None, to, .. } if to == near
    ));

    assert!(tracker.observe(&assignment, now).is_none());
    assert_eq!(tracker.state().basin_transitions, 1);
}

#[tokio::test]
async fn test_events_and_snapshots_reach_the_store() {
    let store = Arc::new(InMemorySnapshotStore::new());
    let persistence = PersistenceConfig {
        snapshot_every: 5,
        ..PersistenceConfig::default()
    };
    let (handle, worker) = PersistenceWorker::spawn(store.clone(), persistence.clone());
    let detector = detector().with_persistence(handle, persistence);

    for _ in 0..10 {
        detector.record_state(&uniform(80.0)).await;
    }
    detector.flush().await.unwrap();

    // calls 5 and 10, then the flush
    assert_eq!(store.save_count().await, 3);
    let events = store.events().await;
    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec!["attractor_detected", "attractor_detected", "basin_transition"]
    );

    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.total_observations, 10);
    assert_eq!(saved.attractors.len(), 2);
    assert_eq!(saved.basin.current, Some(AttractorId(1)));

    assert_eq!(detector.stats().await.persistence_dropped, 0);
    drop(detector);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_restored_detector_matches_original() {
    let original = detector();
    for step in 0..12 {
        let value = if step % 3 == 0 { 30.0 } else { 60.0 };
        original.record_state(&uniform(value)).await;
    }

    let restored = detector();
    restored
        .restore(original.snapshot(100).await)
        .await
        .unwrap();

    for step in 0..12 {
        let value = if step % 2 == 0 { 40.0 } else { 70.0 };
        let a = original.record_state(&uniform(value)).await;
        let b = restored.record_state(&uniform(value)).await;

        assert_eq!(a.basin, b.basin, "step {step}");
        assert_eq!(a.detections.len(), b.detections.len(), "step {step}");
        for (x, y) in a.detections.iter().zip(&b.detections) {
            assert_eq!(x.created, y.created);
            assert_eq!(x.attractor.id, y.attractor.id);
            assert_eq!(x.attractor.kind, y.attractor.kind);
            assert_eq!(x.attractor.center, y.attractor.center);
            assert_eq!(x.attractor.observation_count, y.attractor.observation_count);
            assert!((x.attractor.strength - y.attractor.strength).abs() < 1e-12);
        }
    }

    let sa = original.stats().await;
    let sb = restored.stats().await;
    assert_eq!(sa.total_observations, sb.total_observations);
    assert_eq!(sa.basin_transitions, sb.basin_transitions);
    assert_eq!(sa.attractor_count, sb.attractor_count);
}
