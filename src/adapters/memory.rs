//! In-memory snapshot store for tests and ephemeral runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DetectorEvent, DetectorSnapshot};
use crate::domain::ports::SnapshotStore;

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshot: RwLock<Option<DetectorSnapshot>>,
    events: RwLock<Vec<DetectorEvent>>,
    saves: RwLock<u64>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `save` has been called.
    pub async fn save_count(&self) -> u64 {
        *self.saves.read().await
    }

    /// All events in append order.
    pub async fn events(&self) -> Vec<DetectorEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &DetectorSnapshot) -> DomainResult<()> {
        *self.snapshot.write().await = Some(snapshot.clone());
        *self.saves.write().await += 1;
        Ok(())
    }

    async fn load(&self) -> DomainResult<Option<DetectorSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn append_event(&self, event: &DetectorEvent) -> DomainResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn recent_events(&self, limit: usize) -> DomainResult<Vec<DetectorEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}
