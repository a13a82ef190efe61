//! Null snapshot store implementation.
//!
//! Used when persistence is disabled but the detector still wants a
//! [`SnapshotStore`] to talk to.

use async_trait::async_trait;

use super::SnapshotStore;
use crate::domain::errors::DomainResult;
use crate::domain::models::{DetectorEvent, DetectorSnapshot};

/// A no-op store that keeps nothing.
#[derive(Debug, Clone, Default)]
pub struct NullSnapshotStore;

impl NullSnapshotStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SnapshotStore for NullSnapshotStore {
    async fn save(&self, _snapshot: &DetectorSnapshot) -> DomainResult<()> {
        Ok(())
    }

    async fn load(&self) -> DomainResult<Option<DetectorSnapshot>> {
        Ok(None)
    }

    async fn append_event(&self, _event: &DetectorEvent) -> DomainResult<()> {
        Ok(())
    }

    async fn recent_events(&self, _limit: usize) -> DomainResult<Vec<DetectorEvent>> {
        Ok(Vec::new())
    }
}
