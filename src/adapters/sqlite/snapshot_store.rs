//! SQLite implementation of the SnapshotStore.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DetectorEvent, DetectorSnapshot, EventPayload};
use crate::domain::ports::SnapshotStore;

const LATEST_SLOT: &str = "latest";

#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of stored events.
    pub async fn event_count(&self) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM detector_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn save(&self, snapshot: &DetectorSnapshot) -> DomainResult<()> {
        let snapshot_json = serde_json::to_string(snapshot)?;

        sqlx::query(
            r#"INSERT INTO detector_snapshots (
                slot, version, taken_at, total_observations, attractor_count, snapshot_json
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(slot) DO UPDATE SET
                version = excluded.version,
                taken_at = excluded.taken_at,
                total_observations = excluded.total_observations,
                attractor_count = excluded.attractor_count,
                snapshot_json = excluded.snapshot_json"#,
        )
        .bind(LATEST_SLOT)
        .bind(i64::from(snapshot.version))
        .bind(snapshot.taken_at.to_rfc3339())
        .bind(i64::try_from(snapshot.total_observations).unwrap_or(i64::MAX))
        .bind(snapshot.attractors.len() as i64)
        .bind(&snapshot_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self) -> DomainResult<Option<DetectorSnapshot>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT snapshot_json FROM detector_snapshots WHERE slot = ?")
                .bind(LATEST_SLOT)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(json,)| {
            serde_json::from_str(&json).map_err(|e| DomainError::CorruptSnapshot(e.to_string()))
        })
        .transpose()
    }

    async fn append_event(&self, event: &DetectorEvent) -> DomainResult<()> {
        let payload_json = serde_json::to_string(&event.payload)?;

        sqlx::query(
            "INSERT INTO detector_events (id, event_type, timestamp, payload_json) VALUES (?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.event_type())
        .bind(event.timestamp.to_rfc3339())
        .bind(&payload_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_events(&self, limit: usize) -> DomainResult<Vec<DetectorEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, timestamp, payload_json FROM detector_events ORDER BY seq DESC LIMIT ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    timestamp: String,
    payload_json: String,
}

impl TryFrom<EventRow> for DetectorEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let payload: EventPayload = serde_json::from_str(&row.payload_json)?;
        Ok(Self {
            id: parse_uuid(&row.id)?,
            timestamp: parse_datetime(&row.timestamp)?,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{AttractorId, BasinState, Dimensions, SNAPSHOT_VERSION};
    use chrono::Utc;

    fn snapshot(total: u64) -> DetectorSnapshot {
        DetectorSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            dimensions: Dimensions::default(),
            trajectory_tail: Vec::new(),
            total_observations: total,
            attractors: Vec::new(),
            next_attractor_id: 1,
            basin: BasinState::default(),
        }
    }

    async fn store() -> SqliteSnapshotStore {
        SqliteSnapshotStore::new(create_migrated_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_load_empty() {
        let store = store().await;
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let store = store().await;
        store.save(&snapshot(5)).await.unwrap();
        store.save(&snapshot(9)).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.total_observations, 9);

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM detector_snapshots")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let store = store().await;
        store.save(&snapshot(1)).await.unwrap();
        sqlx::query("UPDATE detector_snapshots SET snapshot_json = '{not json'")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, DomainError::CorruptSnapshot(_)));
    }

    #[tokio::test]
    async fn test_recent_events_newest_first() {
        let store = store().await;
        for i in 1..=3u64 {
            let event = DetectorEvent::new(
                EventPayload::BasinTransition {
                    from: None,
                    to: AttractorId(i),
                    distance: 1.0,
                    transitions: i,
                },
                Utc::now(),
            );
            store.append_event(&event).await.unwrap();
        }

        let events = store.recent_events(2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].payload, EventPayload::BasinTransition { to: AttractorId(3), .. }));
        assert!(matches!(events[1].payload, EventPayload::BasinTransition { to: AttractorId(2), .. }));
        assert_eq!(store.event_count().await.unwrap(), 3);
    }
}
