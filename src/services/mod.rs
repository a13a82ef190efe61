pub mod attractor_detector;
pub mod basin_tracker;
pub mod detectors;
pub mod persistence_worker;
pub mod registry;

pub use attractor_detector::{AttractorDetector, Detection, DetectorStats, RecordOutcome};
pub use basin_tracker::{assign_basin, BasinTracker};
pub use detectors::{
    check_for_attractors, detect_fixed_point, detect_limit_cycle, detect_strange_attractor,
};
pub use persistence_worker::{
    PersistenceCommand, PersistenceHandle, PersistenceStatus, PersistenceWorker,
};
pub use registry::{AttractorRegistry, UpsertOutcome};
