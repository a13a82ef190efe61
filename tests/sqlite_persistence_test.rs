//! Snapshot and event persistence against a real SQLite file.

use std::collections::HashMap;
use std::sync::Arc;

use basin_watch::adapters::sqlite::initialize_database;
use basin_watch::{
    AttractorDetector, DetectorConfig, DomainError, PersistenceConfig, PersistenceWorker,
    SnapshotStore, SqliteSnapshotStore,
};

fn uniform(value: f64) -> HashMap<String, f64> {
    ["focus", "pace", "depth", "breadth", "risk"]
        .iter()
        .map(|d| ((*d).to_string(), value))
        .collect()
}

async fn open_store(path: &std::path::Path) -> Arc<SqliteSnapshotStore> {
    let pool = initialize_database(path.to_str().unwrap()).await.unwrap();
    Arc::new(SqliteSnapshotStore::new(pool))
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("state").join("basin-watch.db");
    let persistence = PersistenceConfig {
        database_path: db.to_string_lossy().into_owned(),
        ..PersistenceConfig::default()
    };

    {
        let store = open_store(&db).await;
        let (handle, worker) = PersistenceWorker::spawn(store.clone(), persistence.clone());
        let detector = AttractorDetector::new(DetectorConfig::default())
            .unwrap()
            .with_persistence(handle, persistence.clone());

        for _ in 0..12 {
            detector.record_state(&uniform(80.0)).await;
        }
        detector.flush().await.unwrap();
        drop(detector);
        worker.await.unwrap();

        // fixed point, period-2 cycle, first basin entry
        assert_eq!(store.event_count().await.unwrap(), 3);
    }

    let store = open_store(&db).await;
    let detector = AttractorDetector::new(DetectorConfig::default()).unwrap();
    assert!(detector.rehydrate(store.as_ref()).await);

    let stats = detector.stats().await;
    assert_eq!(stats.total_observations, 12);
    assert_eq!(stats.attractor_count, 2);
    assert_eq!(stats.basin_transitions, 1);
    assert_eq!(stats.trajectory_len, 12);

    // the next observation merges into the restored attractors
    let outcome = detector.record_state(&uniform(80.0)).await;
    assert_eq!(outcome.detections.len(), 2);
    for detection in &outcome.detections {
        assert!(!detection.created);
        assert_eq!(detection.attractor.observation_count, 6);
    }

    let events = store.recent_events(10).await.unwrap();
    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec!["basin_transition", "attractor_detected", "attractor_detected"]
    );
}

#[tokio::test]
async fn test_rehydrate_fails_closed_on_dimension_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("basin-watch.db");
    let store = open_store(&db).await;

    let source = AttractorDetector::new(DetectorConfig::default()).unwrap();
    for _ in 0..10 {
        source.record_state(&uniform(50.0)).await;
    }
    store.save(&source.snapshot(100).await).await.unwrap();

    let config = DetectorConfig {
        dimensions: basin_watch::Dimensions::new(["energy", "mood"]).unwrap(),
        ..DetectorConfig::default()
    };
    let detector = AttractorDetector::new(config).unwrap();

    assert!(!detector.rehydrate(store.as_ref()).await);
    assert!(detector.attractors().await.is_empty());
    assert_eq!(detector.stats().await.total_observations, 0);
}

#[tokio::test]
async fn test_missing_snapshot_starts_cold() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir.path().join("empty.db")).await;

    assert!(store.load().await.unwrap().is_none());
    let detector = AttractorDetector::new(DetectorConfig::default()).unwrap();
    assert!(!detector.rehydrate(store.as_ref()).await);
}

#[tokio::test]
async fn test_restore_rejects_unknown_version() {
    let detector = AttractorDetector::new(DetectorConfig::default()).unwrap();
    let mut snapshot = detector.snapshot(10).await;
    snapshot.version += 1;

    let err = detector.restore(snapshot).await.unwrap_err();
    assert!(matches!(err, DomainError::CorruptSnapshot(_)));
}
