//! Infrastructure adapters for external systems.

pub mod memory;
pub mod sqlite;

pub use memory::InMemorySnapshotStore;
pub use sqlite::SqliteSnapshotStore;
