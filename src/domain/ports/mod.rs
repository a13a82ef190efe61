//! Port trait definitions (Hexagonal Architecture)
//!
//! - SnapshotStore: durable snapshot and audit event sink
//!
//! Keeping the detector behind this trait lets it run against SQLite, an
//! in-memory store, or nothing at all.

pub mod null_store;
pub mod snapshot_store;

pub use null_store::NullSnapshotStore;
pub use snapshot_store::SnapshotStore;
