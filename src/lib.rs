//! basin-watch - online behavioral attractor detection
//!
//! basin-watch ingests a stream of behavioral state vectors, keeps a bounded
//! trajectory of them, and recognizes recurring regimes: fixed points,
//! limit cycles and bounded chaotic wandering. Recognized attractors live in
//! a capacity-bounded registry; every new state is assigned to its nearest
//! basin, and switches between basins are counted and audited.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the persistence port
//! - **Service Layer** (`services`): detectors, registry, basin tracking and
//!   the detector facade with its background persistence worker
//! - **Adapters** (`adapters`): SQLite and in-memory snapshot stores
//! - **Infrastructure Layer** (`infrastructure`): config loading and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use basin_watch::{AttractorDetector, DetectorConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let detector = AttractorDetector::new(DetectorConfig::default())?;
//! let raw: HashMap<String, f64> = [("focus".to_string(), 80.0)].into_iter().collect();
//! let outcome = detector.record_state(&raw).await;
//! println!("nearest basin: {:?}", outcome.basin.attractor_id);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{InMemorySnapshotStore, SqliteSnapshotStore};
pub use domain::models::{
    Attractor, AttractorId, AttractorKind, AttractorMetadata, BasinAssignment, Config,
    DetectorConfig, DetectorEvent, DetectorSnapshot, Dimensions, EventPayload, PersistenceConfig,
    StateVector,
};
pub use domain::ports::{NullSnapshotStore, SnapshotStore};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AttractorDetector, DetectorStats, PersistenceHandle, PersistenceWorker, RecordOutcome,
};
