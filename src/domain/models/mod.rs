pub mod attractor;
pub mod basin;
pub mod config;
pub mod events;
pub mod inference;
pub mod snapshot;
pub mod state;
pub mod trajectory;

pub use attractor::{Attractor, AttractorId, AttractorKind, AttractorMetadata, Bounds, Candidate};
pub use basin::{BasinAssignment, BasinState};
pub use config::{
    Config, ConfigError, DetectorConfig, InferenceConfig, LoggingConfig, PersistenceConfig,
};
pub use events::{DetectorEvent, EventPayload};
pub use inference::{default_rules, InferenceRule, RuleTable};
pub use snapshot::{DetectorSnapshot, SNAPSHOT_VERSION};
pub use state::{Dimensions, StateVector};
pub use trajectory::Trajectory;
