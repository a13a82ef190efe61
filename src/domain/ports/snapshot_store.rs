//! Snapshot store port for detector persistence.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DetectorEvent, DetectorSnapshot};

/// Durable sink for detector snapshots and audit events.
///
/// Abstracts the storage backend (SQLite, in-memory, etc.). The detector
/// only ever keeps the latest snapshot; events are append-only.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, replacing any previous one.
    async fn save(&self, snapshot: &DetectorSnapshot) -> DomainResult<()>;

    /// Load the most recent snapshot.
    ///
    /// `Ok(None)` means nothing was ever saved. A snapshot that exists but
    /// cannot be decoded is `Err(DomainError::CorruptSnapshot)`.
    async fn load(&self) -> DomainResult<Option<DetectorSnapshot>>;

    /// Append an audit event.
    async fn append_event(&self, event: &DetectorEvent) -> DomainResult<()>;

    /// Most recent events, newest first.
    async fn recent_events(&self, limit: usize) -> DomainResult<Vec<DetectorEvent>>;
}
