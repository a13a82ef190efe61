use basin_watch::domain::models::state::euclidean_distance;
use basin_watch::domain::models::{AttractorKind, Candidate, StateVector};
use basin_watch::services::detectors::{
    check_for_attractors, detect_fixed_point, detect_limit_cycle, detect_strange_attractor,
};
use basin_watch::services::{assign_basin, AttractorRegistry};
use basin_watch::DetectorConfig;
use chrono::Utc;
use proptest::prelude::*;

fn states(rows: &[Vec<f64>]) -> Vec<StateVector> {
    let now = Utc::now();
    rows.iter()
        .map(|r| StateVector::from_values(r.clone(), now))
        .collect()
}

fn two_dim_config() -> DetectorConfig {
    DetectorConfig {
        dimensions: basin_watch::Dimensions::new(["x", "y"]).unwrap(),
        ..DetectorConfig::default()
    }
}

fn arb_kind() -> impl Strategy<Value = AttractorKind> {
    prop_oneof![
        Just(AttractorKind::FixedPoint),
        Just(AttractorKind::LimitCycle),
        Just(AttractorKind::StrangeAttractor),
    ]
}

fn candidate(kind: AttractorKind, center: Vec<f64>, strength: f64) -> Candidate {
    match kind {
        AttractorKind::FixedPoint => Candidate::fixed_point(center, strength),
        AttractorKind::LimitCycle => Candidate::limit_cycle(center, strength, 2, Vec::new()),
        AttractorKind::StrangeAttractor => Candidate::strange_attractor(center, strength, Vec::new()),
    }
}

proptest! {
    /// Property: the registry never grows past its capacity
    #[test]
    fn prop_registry_never_exceeds_capacity(
        capacity in 1usize..12,
        inserts in prop::collection::vec(
            (arb_kind(), prop::collection::vec(0.0f64..100.0, 2), 0.0f64..1.0),
            1..80,
        ),
    ) {
        let mut registry = AttractorRegistry::new(capacity, 0.24, 20.0);
        let now = Utc::now();
        for (kind, center, strength) in inserts {
            registry.upsert(candidate(kind, center, strength), now);
            prop_assert!(registry.len() <= capacity);
        }
    }

    /// Property: a same-kind detection within merge distance never duplicates
    #[test]
    fn prop_nearby_detections_merge(
        kind in arb_kind(),
        center in prop::collection::vec(20.0f64..80.0, 3),
        offset in prop::collection::vec(-10.0f64..10.0, 3),
        first in 0.0f64..1.0,
        second in 0.0f64..1.0,
    ) {
        let moved: Vec<f64> = center.iter().zip(&offset).map(|(c, o)| c + o).collect();
        prop_assume!(euclidean_distance(&center, &moved) <= 20.0);

        let mut registry = AttractorRegistry::new(32, 0.24, 20.0);
        let now = Utc::now();
        let a = registry.upsert(candidate(kind, center, first), now);
        let b = registry.upsert(candidate(kind, moved, second), now);

        prop_assert!(a.created);
        prop_assert!(!b.created);
        prop_assert_eq!(a.attractor.id, b.attractor.id);
        prop_assert_eq!(registry.len(), 1);
        prop_assert_eq!(b.attractor.observation_count, 2);
        prop_assert!((b.attractor.strength - (first + second) / 2.0).abs() < 1e-12);
    }

    /// Property: identical states are a fixed point centered on that state
    #[test]
    fn prop_identical_states_are_stable(
        value in prop::collection::vec(0.0f64..=100.0, 2),
        len in 8usize..=16,
    ) {
        let config = two_dim_config();
        let window = states(&vec![value.clone(); len]);

        let found = detect_fixed_point(&window, &config);
        prop_assert!(found.is_some());
        let found = found.unwrap();
        prop_assert!(found.strength >= config.stability_threshold);
        for (c, v) in found.center.iter().zip(&value) {
            prop_assert!((c - v).abs() < 1e-9);
        }
    }

    /// Property: an exact repetition with period p is reported as period p
    #[test]
    fn prop_exact_repetition_reports_its_period(
        period in 2usize..=8,
        base in 0.0f64..20.0,
        phase in 0usize..8,
    ) {
        let config = two_dim_config();
        let cycle: Vec<Vec<f64>> = (0..period)
            .map(|k| {
                let v = base + k as f64 * 10.0;
                vec![v, 100.0 - v]
            })
            .collect();
        let rows: Vec<Vec<f64>> = (0..config.window_size)
            .map(|i| cycle[(i + phase) % period].clone())
            .collect();
        let window = states(&rows);

        let found = detect_limit_cycle(&window, &config);
        prop_assert!(found.is_some());
        prop_assert_eq!(found.unwrap().metadata.period(), Some(period));
    }

    /// Property: strange attractors never share a window with the other kinds
    #[test]
    fn prop_strange_attractor_is_exclusive(
        rows in prop::collection::vec(prop::collection::vec(0.0f64..=100.0, 2), 8..=16),
        threshold in 0.5f64..0.99,
    ) {
        let config = DetectorConfig {
            stability_threshold: threshold,
            ..two_dim_config()
        };
        let window = states(&rows);

        if detect_strange_attractor(&window, &config).is_some() {
            prop_assert!(detect_fixed_point(&window, &config).is_none());
            prop_assert!(detect_limit_cycle(&window, &config).is_none());
        }

        let kinds: Vec<AttractorKind> =
            check_for_attractors(&window, &config).iter().map(|c| c.kind).collect();
        if kinds.contains(&AttractorKind::StrangeAttractor) {
            prop_assert_eq!(kinds, vec![AttractorKind::StrangeAttractor]);
        }
    }

    /// Property: basin assignment is deterministic and picks the lowest id on ties
    #[test]
    fn prop_basin_assignment_is_deterministic(
        centers in prop::collection::vec(
            prop::collection::vec((0u8..=10).prop_map(|v| f64::from(v) * 10.0), 2),
            1..16,
        ),
        state in prop::collection::vec((0u8..=10).prop_map(|v| f64::from(v) * 10.0), 2),
    ) {
        // merge_distance 0 only folds identical centers together
        let mut registry = AttractorRegistry::new(64, 0.24, 0.0);
        let now = Utc::now();
        for center in centers {
            registry.upsert(Candidate::fixed_point(center, 0.5), now);
        }

        let first = assign_basin(&registry, &state, 30.0);
        let second = assign_basin(&registry, &state, 30.0);
        prop_assert_eq!(first, second);

        let best = registry
            .iter()
            .map(|a| euclidean_distance(&state, &a.center))
            .fold(f64::INFINITY, f64::min);
        let expected = registry
            .iter()
            .find(|a| euclidean_distance(&state, &a.center) == best)
            .map(|a| a.id);
        prop_assert_eq!(first.attractor_id, expected);
        prop_assert_eq!(first.distance, Some(best));
        prop_assert_eq!(first.is_near, best < 30.0);
    }
}
