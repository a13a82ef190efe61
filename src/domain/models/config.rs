use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::inference::{default_rules, InferenceRule};
use super::state::Dimensions;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Dimension set cannot be empty")]
    EmptyDimensions,

    #[error("Too many dimensions: {0}. At most 8 are supported")]
    TooManyDimensions(usize),

    #[error("Duplicate dimension: {0}")]
    DuplicateDimension(String),

    #[error("Invalid window: window_size ({window}) must be at least min_observations ({min}) and min_observations at least 2")]
    InvalidWindow { window: usize, min: usize },

    #[error("Invalid {name}: {value}. Must be between 0 and 1")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("Invalid {name}: {value}. Must be positive")]
    NonPositive { name: &'static str, value: f64 },

    #[error("Invalid max_period: {0}. Must be at least 2")]
    InvalidMaxPeriod(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for basin-watch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Detection thresholds and capacities
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Snapshot and audit sink configuration
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Flag → dimension delta rules used by `infer_state`
    #[serde(default)]
    pub inference: InferenceConfig,
}

// ---------------------------------------------------------------------------
// DetectorConfig
// ---------------------------------------------------------------------------

/// Thresholds, window sizes and capacities for one detector instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DetectorConfig {
    /// Named dimensions every observation is projected onto
    #[serde(default)]
    pub dimensions: Dimensions,

    /// Number of most recent observations the detectors look at
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Observations required in the window before any detector fires
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,

    /// Stability / similarity needed for fixed points and limit cycles
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,

    /// Longest cycle period searched for
    #[serde(default = "default_max_period")]
    pub max_period: usize,

    /// Per-dimension range a window must stay under to count as bounded
    #[serde(default = "default_boundedness_cap")]
    pub boundedness_cap: f64,

    /// Trajectory length cap; exceeding it drops the oldest half
    #[serde(default = "default_max_trajectory")]
    pub max_trajectory: usize,

    /// Registry capacity
    #[serde(default = "default_max_attractors")]
    pub max_attractors: usize,

    /// Fraction of the registry evicted when an insert finds it full
    #[serde(default = "default_prune_fraction")]
    pub prune_fraction: f64,

    /// Centers closer than this (same kind) are the same attractor
    #[serde(default = "default_merge_distance")]
    pub merge_distance: f64,

    /// Distance under which a state is "near" its basin attractor
    #[serde(default = "default_near_threshold")]
    pub near_threshold: f64,
}

const fn default_window_size() -> usize {
    16
}

const fn default_min_observations() -> usize {
    8
}

const fn default_stability_threshold() -> f64 {
    0.618
}

const fn default_max_period() -> usize {
    8
}

const fn default_boundedness_cap() -> f64 {
    1.618 * 50.0
}

const fn default_max_trajectory() -> usize {
    1000
}

const fn default_max_attractors() -> usize {
    32
}

const fn default_prune_fraction() -> f64 {
    0.24
}

const fn default_merge_distance() -> f64 {
    20.0
}

const fn default_near_threshold() -> f64 {
    30.0
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::default(),
            window_size: default_window_size(),
            min_observations: default_min_observations(),
            stability_threshold: default_stability_threshold(),
            max_period: default_max_period(),
            boundedness_cap: default_boundedness_cap(),
            max_trajectory: default_max_trajectory(),
            max_attractors: default_max_attractors(),
            prune_fraction: default_prune_fraction(),
            merge_distance: default_merge_distance(),
            near_threshold: default_near_threshold(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_observations < 2 || self.window_size < self.min_observations {
            return Err(ConfigError::InvalidWindow {
                window: self.window_size,
                min: self.min_observations,
            });
        }

        if !(0.0..=1.0).contains(&self.stability_threshold) {
            return Err(ConfigError::InvalidFraction {
                name: "stability_threshold",
                value: self.stability_threshold,
            });
        }

        if self.prune_fraction <= 0.0 || self.prune_fraction > 1.0 {
            return Err(ConfigError::InvalidFraction {
                name: "prune_fraction",
                value: self.prune_fraction,
            });
        }

        if self.max_period < 2 {
            return Err(ConfigError::InvalidMaxPeriod(self.max_period));
        }

        let positives = [
            ("boundedness_cap", self.boundedness_cap),
            ("merge_distance", self.merge_distance),
            ("near_threshold", self.near_threshold),
            ("max_attractors", self.max_attractors as f64),
        ];
        for (name, value) in positives {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if self.max_trajectory < self.window_size {
            return Err(ConfigError::ValidationFailed(format!(
                "max_trajectory ({}) must be at least window_size ({})",
                self.max_trajectory, self.window_size
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PersistenceConfig
// ---------------------------------------------------------------------------

/// Snapshot cadence and the retry policy for the background writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PersistenceConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Snapshot after this many `record_state` calls (0 disables)
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,

    /// Snapshot when this many seconds passed since the previous one (0 disables)
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Most recent trajectory entries kept in a snapshot
    #[serde(default = "default_snapshot_tail")]
    pub snapshot_tail: usize,

    /// Pending writes buffered before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound on a single write attempt
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Give up on a write after retrying for this long
    #[serde(default = "default_max_retry_elapsed_ms")]
    pub max_retry_elapsed_ms: u64,

    /// Load the latest snapshot at startup
    #[serde(default = "default_true")]
    pub rehydrate_on_start: bool,
}

fn default_database_path() -> String {
    ".basin-watch/basin-watch.db".to_string()
}

const fn default_snapshot_every() -> u64 {
    50
}

const fn default_snapshot_interval_secs() -> u64 {
    30
}

const fn default_snapshot_tail() -> usize {
    100
}

const fn default_queue_capacity() -> usize {
    256
}

const fn default_write_timeout_ms() -> u64 {
    2_000
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

const fn default_max_retry_elapsed_ms() -> u64 {
    30_000
}

const fn default_true() -> bool {
    true
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            snapshot_every: default_snapshot_every(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            snapshot_tail: default_snapshot_tail(),
            queue_capacity: default_queue_capacity(),
            write_timeout_ms: default_write_timeout_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_retry_elapsed_ms: default_max_retry_elapsed_ms(),
            rehydrate_on_start: true,
        }
    }
}

impl PersistenceConfig {
    pub const fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly, never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_log_rotation(),
        }
    }
}

// ---------------------------------------------------------------------------
// InferenceConfig
// ---------------------------------------------------------------------------

/// Rule table for turning behavior flags into raw observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InferenceConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<InferenceRule>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}
